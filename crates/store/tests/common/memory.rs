use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;
use stevedore_core::{ContentDigest, DigestAlgorithm, digest_bytes};
use stevedore_store::{
    DIGEST_ALGORITHM_METADATA_KEY, DIGEST_METADATA_KEY, MultipartStore, ObjectHead, PartAck,
    StoreError, StoreResult,
};

/// In-memory store that mirrors S3's multipart contract closely enough for
/// session and pipeline tests: per-part Content-MD5 verification, upload-id
/// bookkeeping, and metadata-carrying head requests.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_upload: u64,
    uploads: HashMap<String, Upload>,
    objects: HashMap<String, StoredObject>,
}

struct Upload {
    bucket: String,
    key: String,
    metadata: HashMap<String, String>,
    parts: HashMap<u32, (String, Bytes)>,
}

#[derive(Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub metadata: HashMap<String, String>,
}

fn object_id(bucket: &str, key: &str) -> String {
    format!("{bucket}/{key}")
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Fetch a stored object's body and metadata, if it exists.
    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        let inner = self.inner.lock().unwrap();
        inner.objects.get(&object_id(bucket, key)).cloned()
    }

    /// Upload ids that have been created but neither completed nor aborted.
    pub fn live_upload_ids(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        let mut ids: Vec<String> = inner.uploads.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MultipartStore for MemoryStore {
    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        expected_digest: &ContentDigest,
    ) -> StoreResult<String> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_upload += 1;
        let upload_id = format!("upload-{}", inner.next_upload);

        let mut metadata = HashMap::new();
        metadata.insert(
            DIGEST_METADATA_KEY.to_string(),
            expected_digest.as_base64().to_string(),
        );
        metadata.insert(
            DIGEST_ALGORITHM_METADATA_KEY.to_string(),
            expected_digest.algorithm().to_string(),
        );

        inner.uploads.insert(
            upload_id.clone(),
            Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                metadata,
                parts: HashMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
        content_md5: &ContentDigest,
    ) -> StoreResult<String> {
        // S3 rejects a part whose body does not match the transmitted digest.
        let actual = digest_bytes(&body, DigestAlgorithm::Md5);
        if actual.as_base64() != content_md5.as_base64() {
            return Err(StoreError::PartUpload {
                part_number,
                reason: "content digest mismatch".to_string(),
            });
        }

        let mut inner = self.inner.lock().unwrap();
        let upload = inner.uploads.get_mut(upload_id).ok_or_else(|| {
            StoreError::NotFound(format!("no multipart upload with id {upload_id}"))
        })?;
        let etag = format!("etag-{upload_id}-{part_number}");
        upload.parts.insert(part_number, (etag.clone(), body));
        Ok(etag)
    }

    async fn complete_multipart_upload(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
        parts: &[PartAck],
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let upload = inner.uploads.remove(upload_id).ok_or_else(|| {
            StoreError::NotFound(format!("no multipart upload with id {upload_id}"))
        })?;

        let mut body = Vec::new();
        for (index, ack) in parts.iter().enumerate() {
            if ack.part_number != index as u32 + 1 {
                return Err(StoreError::Finalize(format!(
                    "part list not contiguous at part {}",
                    ack.part_number
                )));
            }
            let (etag, data) = upload.parts.get(&ack.part_number).ok_or_else(|| {
                StoreError::Finalize(format!("part {} was never uploaded", ack.part_number))
            })?;
            if *etag != ack.etag {
                return Err(StoreError::Finalize(format!(
                    "etag mismatch for part {}",
                    ack.part_number
                )));
            }
            body.extend_from_slice(data);
        }

        inner.objects.insert(
            object_id(&upload.bucket, &upload.key),
            StoredObject {
                body: Bytes::from(body),
                metadata: upload.metadata,
            },
        );
        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.uploads.remove(upload_id).ok_or_else(|| {
            StoreError::NotFound(format!("no multipart upload with id {upload_id}"))
        })?;
        Ok(())
    }

    async fn head_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectHead> {
        let inner = self.inner.lock().unwrap();
        let object = inner
            .objects
            .get(&object_id(bucket, key))
            .ok_or_else(|| StoreError::NotFound(format!("{bucket}/{key}")))?;
        Ok(ObjectHead {
            size: object.body.len() as u64,
            digest: object.metadata.get(DIGEST_METADATA_KEY).cloned(),
            digest_algorithm: object.metadata.get(DIGEST_ALGORITHM_METADATA_KEY).cloned(),
        })
    }
}
