use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::constants::HASH_CHUNK_SIZE;

/// Digest used for the chain-of-custody fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    /// SHA-256, hex encoded.
    Sha256,
    /// BLAKE3 (256-bit), hex encoded.
    Blake3,
}

impl std::str::FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            _ => Err(format!("Unknown digest algorithm: {}", s)),
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DigestAlgorithm::Sha256 => write!(f, "sha256"),
            DigestAlgorithm::Blake3 => write!(f, "blake3"),
        }
    }
}

enum StreamingDigest {
    Sha256(Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl StreamingDigest {
    fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            DigestAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        match self {
            Self::Sha256(hasher) => hasher.update(bytes),
            Self::Blake3(hasher) => {
                hasher.update(bytes);
            }
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Sha256(hasher) => format!("{:x}", hasher.finalize()),
            Self::Blake3(hasher) => hasher.finalize().to_hex().to_string(),
        }
    }
}

/// Digests everything `reader` yields, reading `chunk_size` bytes at a time.
///
/// Memory use is bounded by `chunk_size` regardless of input length, and the result
/// does not depend on the chunk size.
pub fn digest_reader<R: Read>(
    mut reader: R,
    algorithm: DigestAlgorithm,
    chunk_size: usize,
) -> io::Result<String> {
    let mut digest = StreamingDigest::new(algorithm);
    let mut buf = vec![0u8; chunk_size.max(1)];

    loop {
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        digest.update(&buf[..read]);
    }

    Ok(digest.finalize_hex())
}

/// Digests a file on disk with [`HASH_CHUNK_SIZE`] reads.
pub fn digest_file(path: &Path, algorithm: DigestAlgorithm) -> io::Result<String> {
    let file = File::open(path)?;
    digest_reader(
        BufReader::with_capacity(HASH_CHUNK_SIZE, file),
        algorithm,
        HASH_CHUNK_SIZE,
    )
}
