use super::memory::MemoryStore;
use async_trait::async_trait;
use bytes::Bytes;
use stevedore_core::ContentDigest;
use stevedore_store::{MultipartStore, ObjectHead, PartAck, StoreError, StoreResult};

/// Wrapper around [`MemoryStore`] that injects failures at chosen points in
/// the multipart lifecycle.
pub struct FaultStore {
    inner: MemoryStore,
    /// Reject the upload of this part number.
    pub fail_part: Option<u32>,
    /// Fail every abort call.
    pub fail_abort: bool,
    /// Fail every finalize call.
    pub fail_finalize: bool,
    /// Under-report the object size by one byte on head requests.
    pub misreport_size: bool,
}

#[allow(dead_code)]
impl FaultStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_part: None,
            fail_abort: false,
            fail_finalize: false,
            misreport_size: false,
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.inner
    }
}

impl Default for FaultStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MultipartStore for FaultStore {
    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        expected_digest: &ContentDigest,
    ) -> StoreResult<String> {
        self.inner
            .create_multipart_upload(bucket, key, expected_digest)
            .await
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
        content_md5: &ContentDigest,
    ) -> StoreResult<String> {
        if self.fail_part == Some(part_number) {
            return Err(StoreError::PartUpload {
                part_number,
                reason: "injected failure".to_string(),
            });
        }
        self.inner
            .upload_part(bucket, key, upload_id, part_number, body, content_md5)
            .await
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartAck],
    ) -> StoreResult<()> {
        if self.fail_finalize {
            return Err(StoreError::Finalize("injected failure".to_string()));
        }
        self.inner
            .complete_multipart_upload(bucket, key, upload_id, parts)
            .await
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> StoreResult<()> {
        if self.fail_abort {
            return Err(StoreError::Abort("injected failure".to_string()));
        }
        self.inner
            .abort_multipart_upload(bucket, key, upload_id)
            .await
    }

    async fn head_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectHead> {
        let mut head = self.inner.head_object(bucket, key).await?;
        if self.misreport_size {
            head.size = head.size.saturating_sub(1);
        }
        Ok(head)
    }
}
