//! Digest algorithms and streaming content digests.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use md5::Md5;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Chunk size for streaming file reads (64 KiB).
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Supported digest algorithms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// MD5, the transport digest S3 understands as `Content-MD5`.
    #[default]
    Md5,
    /// SHA-256.
    Sha256,
}

impl DigestAlgorithm {
    /// Parse an algorithm by name.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "md5" => Ok(Self::Md5),
            "sha256" => Ok(Self::Sha256),
            other => Err(Error::UnsupportedAlgorithm(other.to_string())),
        }
    }

    /// Canonical algorithm name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DigestAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A base64-encoded content digest together with the algorithm that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentDigest {
    algorithm: DigestAlgorithm,
    encoded: String,
}

impl ContentDigest {
    /// The algorithm that produced this digest.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// The digest as a base64 (STANDARD) string.
    pub fn as_base64(&self) -> &str {
        &self.encoded
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

enum Inner {
    Md5(Md5),
    Sha256(Sha256),
}

/// Incremental digest computation over a chosen algorithm.
pub struct DigestHasher {
    algorithm: DigestAlgorithm,
    inner: Inner,
}

impl DigestHasher {
    /// Create a new hasher for the given algorithm.
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        let inner = match algorithm {
            DigestAlgorithm::Md5 => Inner::Md5(Md5::new()),
            DigestAlgorithm::Sha256 => Inner::Sha256(Sha256::new()),
        };
        Self { algorithm, inner }
    }

    /// Update the hasher with data.
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.inner {
            Inner::Md5(h) => h.update(data),
            Inner::Sha256(h) => h.update(data),
        }
    }

    /// Finalize and return the base64-encoded digest.
    pub fn finalize(self) -> ContentDigest {
        let encoded = match self.inner {
            Inner::Md5(h) => STANDARD.encode(h.finalize()),
            Inner::Sha256(h) => STANDARD.encode(h.finalize()),
        };
        ContentDigest {
            algorithm: self.algorithm,
            encoded,
        }
    }
}

/// One-shot digest of an in-memory buffer.
pub fn digest_bytes(data: &[u8], algorithm: DigestAlgorithm) -> ContentDigest {
    let mut hasher = DigestHasher::new(algorithm);
    hasher.update(data);
    hasher.finalize()
}

/// Streaming digest of a file, read in bounded chunks.
///
/// Never loads the whole file into memory, so it is usable on arbitrarily
/// large sources as well as individual piece files.
pub async fn digest_file(path: &Path, algorithm: DigestAlgorithm) -> Result<ContentDigest> {
    let mut file = File::open(path).await?;
    let mut hasher = DigestHasher::new(algorithm);
    let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}
