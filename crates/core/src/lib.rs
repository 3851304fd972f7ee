//! Core primitives for stevedore.
//!
//! This crate defines the leaf building blocks of the upload pipeline:
//! - Digest algorithms and streaming content digests
//! - Splitting a source file into an ordered sequence of piece files

pub mod digest;
pub mod error;
pub mod piece;

pub use digest::{ContentDigest, DigestAlgorithm, DigestHasher, digest_bytes, digest_file};
pub use error::{Error, Result};
pub use piece::{Piece, split_file};

/// Default maximum piece size: 10 MiB.
pub const DEFAULT_PIECE_SIZE: u64 = 10 * 1024 * 1024;

/// Minimum part size S3 accepts for all but the final part: 5 MiB.
pub const MIN_REMOTE_PART_SIZE: u64 = 5 * 1024 * 1024;
