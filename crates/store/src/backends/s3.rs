//! S3-compatible store backend using the AWS SDK.

use crate::error::{StoreError, StoreResult};
use crate::traits::{
    DIGEST_ALGORITHM_METADATA_KEY, DIGEST_METADATA_KEY, MultipartStore, ObjectHead, PartAck,
};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_smithy_http_client::Builder as SmithyHttpClientBuilder;
use bytes::Bytes;
use stevedore_core::ContentDigest;
use tracing::instrument;

fn map_s3_error<E>(err: aws_sdk_s3::error::SdkError<E>) -> StoreError
where
    E: std::error::Error + Send + Sync + 'static,
{
    StoreError::S3(Box::new(err))
}

/// Render an SDK error with its full source chain, for error variants that
/// carry a textual reason.
fn sdk_error_text<E>(err: &aws_sdk_s3::error::SdkError<E>) -> String
where
    E: std::error::Error + Send + Sync + 'static,
{
    aws_sdk_s3::error::DisplayErrorContext(err).to_string()
}

/// Handle bare host:port endpoints (e.g., "minio:9000") by prepending http://.
fn normalize_endpoint(endpoint: &str) -> String {
    let lower = endpoint.to_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    }
}

/// S3-compatible multipart store using the AWS SDK.
pub struct S3Store {
    client: Client,
    endpoint: Option<String>,
    region: String,
}

impl std::fmt::Debug for S3Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Store")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl S3Store {
    /// Create a new S3 store.
    ///
    /// # Arguments
    /// * `endpoint` - Explicit S3-compatible endpoint; AWS S3 when `None`.
    /// * `force_path_style` - Use path-style URLs (`endpoint/bucket/key`)
    ///   instead of virtual-hosted style. Required for MinIO and some
    ///   S3-compatible services; AWS S3 itself wants virtual-hosted style.
    pub async fn new(
        endpoint: Option<String>,
        region: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        force_path_style: bool,
    ) -> StoreResult<Self> {
        if access_key_id.is_some() ^ secret_access_key.is_some() {
            return Err(StoreError::Config(
                "both access_key_id and secret_access_key are required when either is set"
                    .to_string(),
            ));
        }

        let resolved_region = region.unwrap_or_else(|| "us-east-1".to_string());
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(resolved_region.clone()))
            .load()
            .await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);

        // Explicit credentials override the ambient AWS credential chain.
        if let (Some(key_id), Some(secret)) = (access_key_id, secret_access_key) {
            let credentials =
                aws_sdk_s3::config::Credentials::new(key_id, secret, None, None, "stevedore");
            builder = builder.credentials_provider(credentials);
        }

        let normalized_endpoint = endpoint.as_deref().map(normalize_endpoint);
        if let Some(endpoint_url) = &normalized_endpoint {
            builder = builder.endpoint_url(endpoint_url);

            // For explicit HTTP endpoints (e.g. local MinIO), use an HTTP-only
            // client so SDK initialization doesn't depend on native trust roots.
            if endpoint_url.to_ascii_lowercase().starts_with("http://") {
                builder = builder.http_client(SmithyHttpClientBuilder::new().build_http());
            }
        }

        if force_path_style {
            builder = builder.force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            endpoint: normalized_endpoint,
            region: resolved_region,
        })
    }
}

#[async_trait]
impl MultipartStore for S3Store {
    #[instrument(skip(self, expected_digest), fields(backend = "s3"))]
    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        expected_digest: &ContentDigest,
    ) -> StoreResult<String> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .metadata(DIGEST_METADATA_KEY, expected_digest.as_base64())
            .metadata(
                DIGEST_ALGORITHM_METADATA_KEY,
                expected_digest.algorithm().as_str(),
            )
            .send()
            .await
            .map_err(map_s3_error)?;

        output
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| StoreError::Config("S3 did not return an upload id".to_string()))
    }

    #[instrument(
        skip(self, body, content_md5),
        fields(backend = "s3", size = body.len())
    )]
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
        content_md5: &ContentDigest,
    ) -> StoreResult<String> {
        let output = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number as i32)
            .content_md5(content_md5.as_base64())
            .body(body.into())
            .send()
            .await
            .map_err(|err| StoreError::PartUpload {
                part_number,
                reason: sdk_error_text(&err),
            })?;

        Ok(output.e_tag().unwrap_or_default().to_string())
    }

    #[instrument(skip(self, parts), fields(backend = "s3", parts = parts.len()))]
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartAck],
    ) -> StoreResult<()> {
        let completed_parts: Vec<CompletedPart> = parts
            .iter()
            .map(|ack| {
                CompletedPart::builder()
                    .e_tag(&ack.etag)
                    .part_number(ack.part_number as i32)
                    .build()
            })
            .collect();

        let completed_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed_upload)
            .send()
            .await
            .map_err(|err| StoreError::Finalize(sdk_error_text(&err)))?;

        Ok(())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> StoreResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|err| StoreError::Abort(sdk_error_text(&err)))?;

        Ok(())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn head_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectHead> {
        let output = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if let aws_sdk_s3::error::SdkError::ServiceError(ref service_err) = err
                    && service_err.raw().status().as_u16() == 404
                {
                    return StoreError::NotFound(format!("{bucket}/{key}"));
                }
                map_s3_error(err)
            })?;

        let metadata = output.metadata();
        Ok(ObjectHead {
            size: output.content_length().unwrap_or(0) as u64,
            digest: metadata.and_then(|m| m.get(DIGEST_METADATA_KEY).cloned()),
            digest_algorithm: metadata
                .and_then(|m| m.get(DIGEST_ALGORITHM_METADATA_KEY).cloned()),
        })
    }
}
