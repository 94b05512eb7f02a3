//! Lucid HTTP server and one-shot CLI entrypoint.
//!
//! - `lucid` serves the HTTP gateway.
//! - `lucid analyze <path>` prints a text report for a local file.
//! - `lucid --health-check` probes a running server (for container health checks).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use lucid::config::Config;
use lucid::gateway::{HandlerState, create_router_with_state};
use lucid::pipeline::Pipeline;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check().await);
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    config.validate()?;

    match args.first().map(String::as_str) {
        Some("analyze") => {
            let path = args
                .get(1)
                .map(PathBuf::from)
                .context("usage: lucid analyze <path>")?;
            run_analyze(&config, path).await
        }
        Some(other) => anyhow::bail!("unknown command '{other}'"),
        None => run_server(config).await,
    }
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    println!(
        r#"
██╗     ██╗   ██╗ ██████╗██╗██████╗
██║     ██║   ██║██╔════╝██║██╔══██╗
██║     ██║   ██║██║     ██║██║  ██║
██║     ██║   ██║██║     ██║██║  ██║
███████╗╚██████╔╝╚██████╗██║██████╔╝
╚══════╝ ╚═════╝  ╚═════╝╚═╝╚═════╝

        SAMPLE. SCORE. TRACE.
                                        AGPL-3.0
"#
    );

    let addr: SocketAddr = config.socket_addr().parse()?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        scratch_dir = %config.scratch_dir.display(),
        "Lucid starting"
    );

    tokio::fs::create_dir_all(&config.scratch_dir)
        .await
        .with_context(|| format!("creating scratch dir {}", config.scratch_dir.display()))?;

    let pipeline = Arc::new(Pipeline::from_config(&config)?);
    let state = HandlerState::new(Arc::clone(&pipeline))
        .with_max_upload_bytes(config.max_upload_bytes);
    let app = create_router_with_state(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Draining pending cleanup jobs...");
    pipeline.cleanup().shutdown().await;

    tracing::info!("Lucid shutdown complete");
    Ok(())
}

async fn run_analyze(config: &Config, path: PathBuf) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    let result = pipeline.analyze_file(&path).await;
    pipeline.cleanup().shutdown().await;

    let report = result.with_context(|| format!("analyzing {}", path.display()))?;
    println!("{report}");
    Ok(())
}

async fn run_health_check() -> i32 {
    let port = std::env::var("LUCID_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8000);

    let url = format!("http://127.0.0.1:{}/healthz", port);

    let Ok(client) = reqwest::Client::builder()
        .timeout(Duration::from_secs(1))
        .build()
    else {
        return 1;
    };

    match client.get(&url).send().await {
        Ok(res) if res.status().is_success() => 0,
        _ => 1,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
