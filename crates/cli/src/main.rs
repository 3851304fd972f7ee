//! Command-line interface for stevedore.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use stevedore_core::{DEFAULT_PIECE_SIZE, DigestAlgorithm, MIN_REMOTE_PART_SIZE};
use stevedore_store::{S3Store, UploadRequest, upload_file};

/// Upload a file to S3-compatible object storage in verified pieces
#[derive(Parser)]
#[command(name = "stevedore")]
#[command(about = "Upload a file to S3-compatible object storage in verified pieces")]
#[command(version)]
struct Cli {
    /// Destination bucket
    bucket_name: String,

    /// File to upload; its basename becomes the object key
    original_filename: PathBuf,

    /// Maximum size of each uploaded piece, in bytes
    #[arg(long, default_value_t = DEFAULT_PIECE_SIZE)]
    file_piece_size: u64,

    /// Keep the local piece files instead of deleting them when done
    #[arg(long)]
    keep_file_pieces: bool,

    /// Whole-file digest algorithm (md5 or sha256)
    #[arg(long, default_value = "md5")]
    digest_algorithm: DigestAlgorithm,

    /// S3 endpoint URL (e.g. http://localhost:9000 for MinIO)
    #[arg(long, env = "STEVEDORE_ENDPOINT")]
    endpoint: Option<String>,

    /// AWS region
    #[arg(long, env = "STEVEDORE_REGION")]
    region: Option<String>,

    /// Access key id; requires --secret-access-key
    #[arg(long, env = "STEVEDORE_ACCESS_KEY_ID")]
    access_key_id: Option<String>,

    /// Secret access key; requires --access-key-id
    #[arg(long, env = "STEVEDORE_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: Option<String>,

    /// Use path-style bucket addressing (required by MinIO and most
    /// self-hosted S3 implementations)
    #[arg(long)]
    force_path_style: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if cli.file_piece_size < MIN_REMOTE_PART_SIZE {
        tracing::warn!(
            piece_size = cli.file_piece_size,
            minimum = MIN_REMOTE_PART_SIZE,
            "piece size is below S3's 5 MiB part minimum; \
             multi-piece uploads may be rejected by the store"
        );
    }

    let store = S3Store::new(
        cli.endpoint,
        cli.region,
        cli.access_key_id,
        cli.secret_access_key,
        cli.force_path_style,
    )
    .await
    .context("failed to configure the object store client")?;

    let mut request = UploadRequest::new(&cli.bucket_name, &cli.original_filename);
    request.max_piece_size = cli.file_piece_size;
    request.keep_pieces = cli.keep_file_pieces;
    request.algorithm = cli.digest_algorithm;

    let report = upload_file(Arc::new(store), &request)
        .await
        .with_context(|| {
            format!(
                "failed to upload {} to bucket {}",
                cli.original_filename.display(),
                cli.bucket_name
            )
        })?;

    println!(
        "Uploaded {} to s3://{}/{} in {} piece(s) ({} bytes)",
        cli.original_filename.display(),
        cli.bucket_name,
        report.key,
        report.piece_count,
        report.bytes_uploaded
    );
    println!(
        "Verified: {} digest {}",
        report.digest.algorithm(),
        report.digest.as_base64()
    );
    if let Some(dir) = report.retained_pieces {
        println!("Piece files kept in {}", dir.display());
    }

    Ok(())
}
