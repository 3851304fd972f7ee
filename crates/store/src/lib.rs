//! Multipart upload pipeline against S3-compatible object storage.
//!
//! This crate provides:
//! - The remote store boundary (`MultipartStore`) and its AWS S3 backend
//! - The upload session state machine (begin, upload parts, finalize or abort)
//! - Post-finalize verification of stored size and digest metadata
//! - The orchestrator wiring splitting, uploading, and verification together

pub mod backends;
pub mod error;
pub mod session;
pub mod traits;
pub mod upload;
pub mod verify;

pub use backends::s3::S3Store;
pub use error::{StoreError, StoreResult};
pub use session::{FinalizedObject, SessionState, UploadSession};
pub use traits::{
    DIGEST_ALGORITHM_METADATA_KEY, DIGEST_METADATA_KEY, MultipartStore, ObjectHead, PartAck,
};
pub use upload::{UploadError, UploadReport, UploadRequest, upload_file};
pub use verify::{FieldMismatch, MismatchError, verify};
