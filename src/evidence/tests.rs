use super::*;
use std::io::Cursor;
use tempfile::TempDir;

const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

#[test]
fn test_sha256_known_vector() {
    let digest = digest_reader(Cursor::new(b"hello"), DigestAlgorithm::Sha256, 4096).unwrap();
    assert_eq!(digest, HELLO_SHA256);
}

#[test]
fn test_blake3_matches_one_shot_hash() {
    let data = b"chain of custody";
    let digest = digest_reader(Cursor::new(data), DigestAlgorithm::Blake3, 3).unwrap();
    assert_eq!(digest, blake3::hash(data).to_hex().to_string());
}

#[test]
fn test_digest_independent_of_chunk_size() {
    let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();

    for algorithm in [DigestAlgorithm::Sha256, DigestAlgorithm::Blake3] {
        let reference = digest_reader(Cursor::new(&data), algorithm, 64 * 1024).unwrap();
        for chunk in [1, 7, 4096, 99_999, 1_000_000] {
            let digest = digest_reader(Cursor::new(&data), algorithm, chunk).unwrap();
            assert_eq!(digest, reference, "{algorithm} differs at chunk size {chunk}");
        }
    }
}

#[test]
fn test_digest_file_is_deterministic() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("artifact.bin");
    std::fs::write(&path, b"hello").unwrap();

    let first = digest_file(&path, DigestAlgorithm::Sha256).unwrap();
    let second = digest_file(&path, DigestAlgorithm::Sha256).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, HELLO_SHA256);
}

#[test]
fn test_digest_algorithm_parsing() {
    assert_eq!("SHA256".parse::<DigestAlgorithm>(), Ok(DigestAlgorithm::Sha256));
    assert_eq!("blake3".parse::<DigestAlgorithm>(), Ok(DigestAlgorithm::Blake3));
    assert!("md5".parse::<DigestAlgorithm>().is_err());
}

#[tokio::test]
async fn test_open_creates_unique_scratch_dirs() {
    let temp = TempDir::new().unwrap();
    let a = EvidenceLedger::open(temp.path(), DigestAlgorithm::Sha256)
        .await
        .unwrap();
    let b = EvidenceLedger::open(temp.path(), DigestAlgorithm::Sha256)
        .await
        .unwrap();

    assert_ne!(a.scratch_dir(), b.scratch_dir());
    assert!(a.scratch_dir().is_dir());
    assert!(b.scratch_dir().is_dir());
    assert_eq!(
        a.snapshot().pending,
        vec![ResourceHandle::Directory(a.scratch_dir().to_path_buf())]
    );
}

#[tokio::test]
async fn test_hash_file_stores_content_hash() {
    let temp = TempDir::new().unwrap();
    let artifact = temp.path().join("clip.mp4");
    std::fs::write(&artifact, b"hello").unwrap();

    let ledger = EvidenceLedger::open(temp.path(), DigestAlgorithm::Sha256)
        .await
        .unwrap();
    let digest = ledger.hash_file(&artifact).await.unwrap();

    assert_eq!(digest, HELLO_SHA256);
    assert_eq!(
        ledger.snapshot().content_hash.as_deref(),
        Some(HELLO_SHA256)
    );
}

#[tokio::test]
async fn test_release_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let ledger = EvidenceLedger::open(temp.path(), DigestAlgorithm::Sha256)
        .await
        .unwrap();

    let path = ledger.allocate_file("jpg");
    std::fs::write(&path, b"sample").unwrap();
    let handle = ResourceHandle::File(path.clone());

    assert_eq!(ledger.release(&handle).await.unwrap(), ReleaseOutcome::Removed);
    assert!(!path.exists());
    assert_eq!(
        ledger.release(&handle).await.unwrap(),
        ReleaseOutcome::AlreadyReleased
    );

    let stranger = ResourceHandle::File(temp.path().join("never-created.jpg"));
    assert_eq!(
        ledger.release(&stranger).await.unwrap(),
        ReleaseOutcome::Untracked
    );
}

#[tokio::test]
async fn test_allocated_but_unwritten_file_releases_as_missing() {
    let temp = TempDir::new().unwrap();
    let ledger = EvidenceLedger::open(temp.path(), DigestAlgorithm::Sha256)
        .await
        .unwrap();

    let path = ledger.allocate_file("jpg");
    let outcome = ledger.release(&ResourceHandle::File(path)).await.unwrap();
    assert_eq!(outcome, ReleaseOutcome::Missing);
}

#[tokio::test]
async fn test_take_pending_returns_newest_first_and_settles() {
    let temp = TempDir::new().unwrap();
    let ledger = EvidenceLedger::open(temp.path(), DigestAlgorithm::Sha256)
        .await
        .unwrap();
    let file = ledger.allocate_file("jpg");

    let pending = ledger.take_pending();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0], ResourceHandle::File(file.clone()));
    assert!(pending[1].is_directory());

    assert!(ledger.take_pending().is_empty());
    assert_eq!(
        ledger.release(&ResourceHandle::File(file)).await.unwrap(),
        ReleaseOutcome::AlreadyReleased
    );

    for handle in &pending {
        handle.release().await.unwrap();
    }
}

#[tokio::test]
async fn test_track_deduplicates() {
    let temp = TempDir::new().unwrap();
    let ledger = EvidenceLedger::open(temp.path(), DigestAlgorithm::Sha256)
        .await
        .unwrap();
    let handle = ResourceHandle::File(temp.path().join("x.jpg"));

    ledger.track(handle.clone());
    ledger.track(handle.clone());

    assert_eq!(ledger.snapshot().pending.len(), 2);
}

#[tokio::test]
async fn test_drop_releases_pending_resources() {
    let temp = TempDir::new().unwrap();
    let scratch;
    {
        let ledger = EvidenceLedger::open(temp.path(), DigestAlgorithm::Sha256)
            .await
            .unwrap();
        let path = ledger.allocate_file("jpg");
        std::fs::write(&path, b"frame").unwrap();
        scratch = ledger.scratch_dir().to_path_buf();
    }

    assert!(!scratch.exists());
}
