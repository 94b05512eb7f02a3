//! Test server harness.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use lucid::budget::SampleBudgeter;
use lucid::cleanup::{CleanupPolicy, CleanupScheduler};
use lucid::fusion::{FusionEngine, FusionPolicy};
use lucid::gateway::{HandlerState, create_router_with_state};
use lucid::media::{MediaSampler, MockVideoDecoder, SamplerConfig};
use lucid::pipeline::{Pipeline, PipelineConfig};
use lucid::scoring::{BranchRunner, MockScorer, ScoringBranch};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const STARTUP_WAIT_TIMEOUT_SECS: u64 = 5;
const STARTUP_POLL_INTERVAL_MS: u64 = 50;

#[derive(Clone)]
pub struct TestServerConfig {
    pub branches: Vec<ScoringBranch>,
    pub video_frames: u64,
    pub cleanup: CleanupPolicy,
    pub max_upload_bytes: usize,
}

impl Default for TestServerConfig {
    fn default() -> Self {
        Self {
            branches: vec![ScoringBranch::new(
                "mock",
                Arc::new(MockScorer::constant(0.1)),
            )],
            video_frames: 12,
            cleanup: CleanupPolicy::Deferred,
            max_upload_bytes: 8 * 1024 * 1024,
        }
    }
}

impl TestServerConfig {
    pub fn with_scorer(mut self, scorer: MockScorer) -> Self {
        self.branches = vec![ScoringBranch::new("mock", Arc::new(scorer))];
        self
    }

    pub fn with_branches(mut self, branches: Vec<ScoringBranch>) -> Self {
        self.branches = branches;
        self
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub pipeline: Arc<Pipeline>,
    scratch: TempDir,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn scratch_root(&self) -> &std::path::Path {
        self.scratch.path()
    }

    /// Waits for deferred cleanup jobs queued so far.
    pub async fn settle(&self) {
        self.pipeline.cleanup().flush().await;
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.pipeline.cleanup().shutdown().await;
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerStartupError {
    #[error("Server failed to start within timeout")]
    Timeout,
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
}

pub fn build_pipeline(config: &TestServerConfig, scratch: &TempDir) -> Pipeline {
    let sampler = MediaSampler::new(
        SamplerConfig::default(),
        Arc::new(MockVideoDecoder::new(config.video_frames, 1.0)),
    );
    let pipeline_config = PipelineConfig {
        cleanup: config.cleanup,
        ..PipelineConfig::new(scratch.path())
    };
    Pipeline::new(
        pipeline_config,
        sampler,
        SampleBudgeter::default(),
        BranchRunner::new(config.branches.clone()).with_timeout(Duration::from_secs(2)),
        FusionEngine::new(FusionPolicy::for_branch_count(config.branches.len())),
        CleanupScheduler::spawn(),
    )
}

/// Spawns a server backed by mock decoders and scorers on an ephemeral port.
pub async fn spawn_test_server(config: TestServerConfig) -> Result<TestServer, ServerStartupError> {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;

    let scratch = TempDir::new()?;
    let pipeline = Arc::new(build_pipeline(&config, &scratch));
    let state = HandlerState::new(Arc::clone(&pipeline))
        .with_max_upload_bytes(config.max_upload_bytes);
    let app = create_router_with_state(state);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    wait_for_server_ready(
        addr,
        Duration::from_secs(STARTUP_WAIT_TIMEOUT_SECS),
        Duration::from_millis(STARTUP_POLL_INTERVAL_MS),
    )
    .await?;

    Ok(TestServer {
        addr,
        pipeline,
        scratch,
        _server_handle: server_handle,
        shutdown_tx: Some(shutdown_tx),
    })
}

pub async fn wait_for_server_ready(
    addr: SocketAddr,
    timeout: Duration,
    interval: Duration,
) -> Result<(), ServerStartupError> {
    let start = std::time::Instant::now();

    loop {
        if start.elapsed() > timeout {
            return Err(ServerStartupError::Timeout);
        }

        match tokio::net::TcpStream::connect(addr).await {
            Ok(_) => return Ok(()),
            Err(_) => tokio::time::sleep(interval).await,
        }
    }
}
