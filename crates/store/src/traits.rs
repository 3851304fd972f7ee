//! Remote store boundary for multipart uploads.

use crate::error::StoreResult;
use async_trait::async_trait;
use bytes::Bytes;
use stevedore_core::ContentDigest;

/// Object metadata key under which the whole-file digest is recorded.
pub const DIGEST_METADATA_KEY: &str = "digest";

/// Object metadata key naming the algorithm that produced the digest.
pub const DIGEST_ALGORITHM_METADATA_KEY: &str = "digest-algorithm";

/// Acknowledgment for one successfully uploaded part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartAck {
    /// 1-based part number.
    pub part_number: u32,
    /// Opaque completion token returned by the store.
    pub etag: String,
}

/// A stored object's metadata, as reported by a head request.
#[derive(Clone, Debug)]
pub struct ObjectHead {
    /// Object size in bytes.
    pub size: u64,
    /// Whole-file digest recorded as metadata at upload time, if present.
    pub digest: Option<String>,
    /// Algorithm name recorded alongside the digest, if present.
    pub digest_algorithm: Option<String>,
}

/// An object store with multipart-upload semantics.
///
/// Any S3-compatible API qualifies. The store must reject an uploaded part
/// when its own digest of the body disagrees with the transmitted one; that
/// rejection is the transport-integrity guarantee the session relies on.
#[async_trait]
pub trait MultipartStore: Send + Sync + 'static {
    /// Register a new multipart upload, attaching the expected whole-file
    /// digest as object metadata. Returns the store-assigned upload id.
    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        expected_digest: &ContentDigest,
    ) -> StoreResult<String>;

    /// Upload one part together with its transport-integrity digest.
    /// Returns the part's completion token (ETag).
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
        content_md5: &ContentDigest,
    ) -> StoreResult<String>;

    /// Assemble the uploaded parts into a single object.
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartAck],
    ) -> StoreResult<()>;

    /// Discard all uploaded parts and release the upload id.
    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> StoreResult<()>;

    /// Fetch a stored object's size and digest metadata.
    async fn head_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectHead>;
}
