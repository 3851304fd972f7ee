//! Multipart upload session state machine.

use crate::error::{StoreError, StoreResult};
use crate::traits::{MultipartStore, PartAck};
use bytes::Bytes;
use std::sync::Arc;
use stevedore_core::{ContentDigest, DigestAlgorithm, digest_bytes};
use tracing::{info, warn};

/// Lifecycle state of an upload session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No remote upload registered yet.
    NotStarted,
    /// Remote upload registered; parts may be uploaded.
    InProgress,
    /// Finalized into a single remote object.
    Completed,
    /// Remote parts discarded.
    Aborted,
}

impl SessionState {
    /// Check whether the session reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

/// The remote result of a finalized upload.
#[derive(Clone, Debug)]
pub struct FinalizedObject {
    /// Destination bucket.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// The upload id the store assigned at begin.
    pub upload_id: String,
    /// Number of parts assembled into the object.
    pub part_count: u32,
}

/// One multipart upload against a remote store.
///
/// Owns the begin → upload-part* → finalize-or-abort lifecycle. Transition
/// guards ensure `InProgress` and each terminal state are entered exactly
/// once, and that parts arrive in strict ascending order starting at 1.
pub struct UploadSession {
    store: Arc<dyn MultipartStore>,
    bucket: String,
    key: String,
    state: SessionState,
    upload_id: Option<String>,
    acks: Vec<PartAck>,
}

impl UploadSession {
    /// Create a session in the `NotStarted` state.
    pub fn new(
        store: Arc<dyn MultipartStore>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            key: key.into(),
            state: SessionState::NotStarted,
            upload_id: None,
            acks: Vec::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The store-assigned upload id, once `begin` has succeeded.
    pub fn upload_id(&self) -> Option<&str> {
        self.upload_id.as_deref()
    }

    /// Part number the next `upload_part` call must carry.
    pub fn next_part_number(&self) -> u32 {
        self.acks.len() as u32 + 1
    }

    /// Acknowledgments collected so far, in ascending part order.
    pub fn acks(&self) -> &[PartAck] {
        &self.acks
    }

    fn require_in_progress(&self, operation: &str) -> StoreResult<String> {
        if self.state != SessionState::InProgress {
            return Err(StoreError::Session(format!(
                "{operation} called in state {:?}",
                self.state
            )));
        }
        self.upload_id
            .clone()
            .ok_or_else(|| StoreError::Session(format!("{operation} without an upload id")))
    }

    /// Register the multipart upload with the remote store, attaching the
    /// expected whole-file digest as object metadata.
    ///
    /// Transition: `NotStarted` → `InProgress`.
    pub async fn begin(&mut self, expected_digest: &ContentDigest) -> StoreResult<()> {
        if self.state != SessionState::NotStarted {
            return Err(StoreError::Session(format!(
                "begin called in state {:?}",
                self.state
            )));
        }

        let upload_id = self
            .store
            .create_multipart_upload(&self.bucket, &self.key, expected_digest)
            .await?;
        info!(
            bucket = %self.bucket,
            key = %self.key,
            upload_id = %upload_id,
            "multipart upload started"
        );

        self.state = SessionState::InProgress;
        self.upload_id = Some(upload_id);
        Ok(())
    }

    /// Upload one piece as the next part.
    ///
    /// The transport digest is computed here, from the exact bytes being
    /// transmitted, so the store can reject a corrupted part. A `PartUpload`
    /// failure means the caller must take the abort path; the session stays
    /// `InProgress` so abort is still possible.
    pub async fn upload_part(&mut self, part_number: u32, body: Bytes) -> StoreResult<()> {
        let upload_id = self.require_in_progress("upload_part")?;

        let expected = self.next_part_number();
        if part_number != expected {
            return Err(StoreError::Session(format!(
                "part {part_number} out of order: expected part {expected}"
            )));
        }

        let content_md5 = digest_bytes(&body, DigestAlgorithm::Md5);
        info!(
            part_number,
            size = body.len(),
            digest = %content_md5,
            "uploading part"
        );

        let etag = self
            .store
            .upload_part(
                &self.bucket,
                &self.key,
                &upload_id,
                part_number,
                body,
                &content_md5,
            )
            .await?;

        self.acks.push(PartAck { part_number, etag });
        Ok(())
    }

    /// Assemble the uploaded parts into the final object.
    ///
    /// Only valid once every expected part has been acknowledged exactly
    /// once, in ascending order. Transition: `InProgress` → `Completed`.
    /// On a store-side rejection the session stays `InProgress` so the
    /// caller can abort.
    pub async fn finalize(&mut self) -> StoreResult<FinalizedObject> {
        let upload_id = self.require_in_progress("finalize")?;

        if self.acks.is_empty() {
            return Err(StoreError::Session(
                "finalize with no uploaded parts".to_string(),
            ));
        }
        for (index, ack) in self.acks.iter().enumerate() {
            let expected = index as u32 + 1;
            if ack.part_number != expected {
                return Err(StoreError::Session(format!(
                    "part ack list not contiguous: found part {} where part {expected} was expected",
                    ack.part_number
                )));
            }
        }

        self.store
            .complete_multipart_upload(&self.bucket, &self.key, &upload_id, &self.acks)
            .await?;

        self.state = SessionState::Completed;
        info!(
            bucket = %self.bucket,
            key = %self.key,
            upload_id = %upload_id,
            parts = self.acks.len(),
            "multipart upload completed"
        );

        Ok(FinalizedObject {
            bucket: self.bucket.clone(),
            key: self.key.clone(),
            upload_id,
            part_count: self.acks.len() as u32,
        })
    }

    /// Discard all uploaded parts and release the session.
    ///
    /// Transition: `InProgress` → `Aborted`. The session is marked aborted
    /// even when the remote call fails, so a single abort is attempted at
    /// most once; the failure is returned for the caller to surface
    /// alongside whatever triggered the abort.
    pub async fn abort(&mut self) -> StoreResult<()> {
        let upload_id = self.require_in_progress("abort")?;

        self.state = SessionState::Aborted;
        let result = self
            .store
            .abort_multipart_upload(&self.bucket, &self.key, &upload_id)
            .await;

        match &result {
            Ok(()) => info!(
                bucket = %self.bucket,
                key = %self.key,
                upload_id = %upload_id,
                "multipart upload aborted"
            ),
            Err(err) => warn!(
                bucket = %self.bucket,
                key = %self.key,
                upload_id = %upload_id,
                error = %err,
                "failed to abort multipart upload; remote parts may be orphaned"
            ),
        }
        result
    }
}

impl Drop for UploadSession {
    fn drop(&mut self) {
        if self.state == SessionState::InProgress {
            warn!(
                bucket = %self.bucket,
                key = %self.key,
                upload_id = self.upload_id.as_deref().unwrap_or("<unknown>"),
                "upload session dropped while in progress; remote upload id may be dangling"
            );
        }
    }
}
