//! End-to-end upload orchestration.

use crate::error::StoreError;
use crate::session::{SessionState, UploadSession};
use crate::traits::MultipartStore;
use crate::verify::{MismatchError, verify};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stevedore_core::{
    ContentDigest, DEFAULT_PIECE_SIZE, DigestAlgorithm, Piece, digest_file, split_file,
};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Upload pipeline errors.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Core(#[from] stevedore_core::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("verification failed: {0}")]
    Verify(#[from] MismatchError),

    #[error("{source} (session abort also failed: {abort_error})")]
    AbortFailed {
        source: Box<UploadError>,
        abort_error: StoreError,
    },
}

/// Parameters for one upload run.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    /// Destination bucket.
    pub bucket: String,
    /// Local file to upload; its basename becomes the object key.
    pub source: PathBuf,
    /// Maximum size of each piece file in bytes.
    pub max_piece_size: u64,
    /// Retain the piece directory instead of deleting it at end of run.
    pub keep_pieces: bool,
    /// Whole-file digest algorithm.
    pub algorithm: DigestAlgorithm,
    /// Root under which the per-run piece directory is created.
    /// Defaults to the system temp dir.
    pub piece_root: Option<PathBuf>,
}

impl UploadRequest {
    /// Create a request with default piece size, digest algorithm, and cleanup.
    pub fn new(bucket: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            bucket: bucket.into(),
            source: source.into(),
            max_piece_size: DEFAULT_PIECE_SIZE,
            keep_pieces: false,
            algorithm: DigestAlgorithm::Md5,
            piece_root: None,
        }
    }
}

/// Summary of a successful run.
#[derive(Clone, Debug)]
pub struct UploadReport {
    /// Object key (the source file's basename).
    pub key: String,
    /// The upload id the store assigned.
    pub upload_id: String,
    /// Number of pieces uploaded.
    pub piece_count: u32,
    /// Total bytes uploaded.
    pub bytes_uploaded: u64,
    /// Whole-file digest, also recorded as object metadata.
    pub digest: ContentDigest,
    /// Piece directory retained at the caller's request, if any.
    pub retained_pieces: Option<PathBuf>,
}

/// Upload `request.source` to the store as one multipart object and verify
/// the stored result against the source digest and size.
///
/// The piece directory is a uniquely named scoped temp dir, removed on every
/// exit path unless `keep_pieces` is set; retention suppresses only the
/// deletion, never the abort logic. A session that began but did not
/// finalize is aborted exactly once before this function returns; an abort
/// failure is surfaced alongside the error that triggered it, never in place
/// of it.
pub async fn upload_file(
    store: Arc<dyn MultipartStore>,
    request: &UploadRequest,
) -> Result<UploadReport, UploadError> {
    let key = object_key(&request.source)?;

    let source_size = tokio::fs::metadata(&request.source)
        .await
        .map_err(stevedore_core::Error::Io)?
        .len();
    let expected_digest = digest_file(&request.source, request.algorithm).await?;
    info!(
        source = %request.source.display(),
        size = source_size,
        algorithm = %request.algorithm,
        digest = %expected_digest,
        "source file hashed"
    );

    // Uniquely named per run, so concurrent runs sharing a temp root never
    // collide over piece files.
    let mut builder = tempfile::Builder::new();
    builder.prefix("stevedore-");
    let piece_dir = match &request.piece_root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    }
    .map_err(stevedore_core::Error::Io)?;

    let result = run(
        store,
        request,
        &key,
        &expected_digest,
        source_size,
        piece_dir.path(),
    )
    .await;

    let retained_pieces = release_pieces(piece_dir, request.keep_pieces);

    let finalized = result?;
    Ok(UploadReport {
        key,
        upload_id: finalized.upload_id,
        piece_count: finalized.part_count,
        bytes_uploaded: source_size,
        digest: expected_digest,
        retained_pieces,
    })
}

/// Split, drive the session to a terminal state, and verify.
async fn run(
    store: Arc<dyn MultipartStore>,
    request: &UploadRequest,
    key: &str,
    expected_digest: &ContentDigest,
    source_size: u64,
    piece_dir: &Path,
) -> Result<crate::session::FinalizedObject, UploadError> {
    let pieces = split_file(&request.source, piece_dir, request.max_piece_size).await?;
    info!(
        count = pieces.len(),
        dir = %piece_dir.display(),
        "source split into pieces"
    );

    let store_for_verify = store.clone();
    let mut session = UploadSession::new(store, &request.bucket, key);

    let finalized = match drive_session(&mut session, expected_digest, &pieces).await {
        Ok(finalized) => finalized,
        Err(err) => return Err(abort_after_failure(&mut session, err).await),
    };

    let head = store_for_verify.head_object(&request.bucket, key).await?;
    verify(&head, expected_digest, source_size)?;
    info!(bucket = %request.bucket, key = %key, "stored object verified");

    Ok(finalized)
}

/// Begin, upload every piece strictly in order, finalize.
///
/// Each piece file is re-read here, so the transport digest the session
/// computes always reflects the bytes actually sent.
async fn drive_session(
    session: &mut UploadSession,
    expected_digest: &ContentDigest,
    pieces: &[Piece],
) -> Result<crate::session::FinalizedObject, UploadError> {
    session.begin(expected_digest).await?;

    let total = pieces.len();
    for piece in pieces {
        info!(
            part = piece.number,
            of = total,
            piece = %piece.path.display(),
            "uploading piece"
        );
        let body = tokio::fs::read(&piece.path)
            .await
            .map_err(stevedore_core::Error::Io)?;
        session.upload_part(piece.number, Bytes::from(body)).await?;
    }

    Ok(session.finalize().await?)
}

/// Abort a session that failed between begin and finalize.
///
/// A session that never reached `InProgress` has nothing to abort. An abort
/// failure is attached to the triggering error rather than replacing it.
async fn abort_after_failure(session: &mut UploadSession, source: UploadError) -> UploadError {
    if session.state() != SessionState::InProgress {
        return source;
    }

    warn!(
        upload_id = session.upload_id().unwrap_or("<unknown>"),
        error = %source,
        "upload failed; aborting multipart session"
    );
    match session.abort().await {
        Ok(()) => source,
        Err(abort_error) => UploadError::AbortFailed {
            source: Box::new(source),
            abort_error,
        },
    }
}

/// Release the scoped piece directory: delete it, or keep it on request.
fn release_pieces(piece_dir: TempDir, keep: bool) -> Option<PathBuf> {
    if keep {
        let path = piece_dir.keep();
        info!(dir = %path.display(), "piece directory retained at user request");
        Some(path)
    } else {
        let path = piece_dir.path().to_path_buf();
        match piece_dir.close() {
            Ok(()) => debug!(dir = %path.display(), "piece directory removed"),
            Err(err) => warn!(
                dir = %path.display(),
                error = %err,
                "failed to remove piece directory"
            ),
        }
        None
    }
}

fn object_key(source: &Path) -> Result<String, UploadError> {
    source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            UploadError::Core(stevedore_core::Error::InvalidSourcePath(
                source.display().to_string(),
            ))
        })
}
