//! Remote store backends.

pub mod s3;
