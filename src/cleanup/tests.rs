use std::path::Path;

use tempfile::TempDir;
use uuid::Uuid;

use super::*;
use crate::evidence::ResourceHandle;

fn scratch_with_files(root: &Path, files: usize) -> (std::path::PathBuf, Vec<ResourceHandle>) {
    let dir = root.join(Uuid::new_v4().to_string());
    std::fs::create_dir_all(&dir).unwrap();

    let mut handles = Vec::new();
    for i in 0..files {
        let path = dir.join(format!("{i}.jpg"));
        std::fs::write(&path, b"sample").unwrap();
        handles.push(ResourceHandle::File(path));
    }
    handles.push(ResourceHandle::Directory(dir.clone()));
    (dir, handles)
}

#[tokio::test]
async fn test_immediate_cleanup_runs_before_returning() {
    let root = TempDir::new().unwrap();
    let (dir, handles) = scratch_with_files(root.path(), 3);
    let scheduler = CleanupScheduler::spawn();

    let report = scheduler
        .submit(CleanupJob::new(Uuid::new_v4(), handles), CleanupPolicy::Immediate)
        .await
        .expect("immediate cleanup reports inline");

    assert_eq!(report.released, 4);
    assert_eq!(report.failed, 0);
    assert!(!dir.exists());
    assert_eq!(scheduler.jobs_completed(), 1);
}

#[tokio::test]
async fn test_deferred_cleanup_runs_on_worker() {
    let root = TempDir::new().unwrap();
    let (dir, handles) = scratch_with_files(root.path(), 2);
    let scheduler = CleanupScheduler::spawn();

    let report = scheduler
        .submit(CleanupJob::new(Uuid::new_v4(), handles), CleanupPolicy::Deferred)
        .await;
    assert!(report.is_none());

    scheduler.flush().await;
    assert!(!dir.exists());
    assert_eq!(scheduler.jobs_completed(), 1);
}

#[tokio::test]
async fn test_missing_handles_are_tolerated() {
    let root = TempDir::new().unwrap();
    let gone = root.path().join("never-created.jpg");
    let scheduler = CleanupScheduler::spawn();

    let report = scheduler
        .submit(
            CleanupJob::new(
                Uuid::new_v4(),
                vec![
                    ResourceHandle::File(gone),
                    ResourceHandle::Directory(root.path().join("no-dir")),
                ],
            ),
            CleanupPolicy::Immediate,
        )
        .await
        .unwrap();

    assert_eq!(report.missing, 2);
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_failure_is_counted_not_raised() {
    let root = TempDir::new().unwrap();
    // A directory released as a file cannot be removed with remove_file.
    let dir = root.path().join("actually-a-dir");
    std::fs::create_dir_all(&dir).unwrap();
    let scheduler = CleanupScheduler::spawn();

    let report = scheduler
        .submit(
            CleanupJob::new(Uuid::new_v4(), vec![ResourceHandle::File(dir.clone())]),
            CleanupPolicy::Immediate,
        )
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    assert!(!report.is_clean());
    assert!(dir.exists());
}

#[tokio::test]
async fn test_shutdown_drains_queued_jobs() {
    let root = TempDir::new().unwrap();
    let scheduler = CleanupScheduler::spawn();

    let mut dirs = Vec::new();
    for _ in 0..5 {
        let (dir, handles) = scratch_with_files(root.path(), 2);
        dirs.push(dir);
        scheduler
            .submit(CleanupJob::new(Uuid::new_v4(), handles), CleanupPolicy::Deferred)
            .await;
    }

    scheduler.shutdown().await;

    assert!(dirs.iter().all(|d| !d.exists()));
    assert_eq!(scheduler.jobs_completed(), 5);
    assert!(scheduler.is_shutdown_initiated());
}

#[tokio::test]
async fn test_submit_after_shutdown_runs_inline() {
    let root = TempDir::new().unwrap();
    let scheduler = CleanupScheduler::spawn();
    scheduler.shutdown().await;
    scheduler.shutdown().await;

    let (dir, handles) = scratch_with_files(root.path(), 1);
    let report = scheduler
        .submit(CleanupJob::new(Uuid::new_v4(), handles), CleanupPolicy::Deferred)
        .await;

    assert_eq!(report.map(|r| r.released), Some(2));
    assert!(!dir.exists());
}

#[tokio::test]
async fn test_clones_share_worker() {
    let root = TempDir::new().unwrap();
    let scheduler = CleanupScheduler::spawn();
    let clone = scheduler.clone();

    let (dir, handles) = scratch_with_files(root.path(), 1);
    clone
        .submit(CleanupJob::new(Uuid::new_v4(), handles), CleanupPolicy::Deferred)
        .await;
    scheduler.flush().await;

    assert!(!dir.exists());
    assert_eq!(scheduler.jobs_completed(), 1);
}

#[test]
fn test_policy_parsing() {
    assert_eq!("immediate".parse::<CleanupPolicy>().unwrap(), CleanupPolicy::Immediate);
    assert_eq!(" Deferred ".parse::<CleanupPolicy>().unwrap(), CleanupPolicy::Deferred);
    assert!("later".parse::<CleanupPolicy>().is_err());
    assert_eq!(CleanupPolicy::default(), CleanupPolicy::Deferred);
}
