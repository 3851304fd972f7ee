//! Splitting a source file into ordered piece files.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Buffer size for the sequential split pass (64 KiB).
const SPLIT_BUF_SIZE: usize = 64 * 1024;

/// One piece of a source file, materialized as a standalone local file.
#[derive(Clone, Debug)]
pub struct Piece {
    /// 1-based piece number; doubles as the remote part number.
    pub number: u32,
    /// Path of the piece file.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
}

/// Split `source` into piece files of at most `max_piece_size` bytes under
/// `dest_dir`, returned in ascending piece order.
///
/// The source is read once, sequentially. Filenames carry a zero-padded index
/// (padding width = digit count of the piece count) so lexical and numeric
/// ordering agree. Only the final piece may be smaller than `max_piece_size`,
/// and it is never empty.
///
/// An empty source is rejected: a multipart upload needs at least one
/// non-empty part. Partially written pieces after an I/O failure are left in
/// place; the caller owns the destination directory's lifecycle.
pub async fn split_file(
    source: &Path,
    dest_dir: &Path,
    max_piece_size: u64,
) -> Result<Vec<Piece>> {
    if max_piece_size == 0 {
        return Err(Error::InvalidPieceSize(0));
    }

    let source_size = tokio::fs::metadata(source).await?.len();
    if source_size == 0 {
        return Err(Error::EmptySource(source.display().to_string()));
    }

    let basename = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidSourcePath(source.display().to_string()))?;

    let piece_count = source_size.div_ceil(max_piece_size);
    let pad_width = piece_count.to_string().len();

    let mut input = File::open(source).await?;
    let mut buf = vec![0u8; SPLIT_BUF_SIZE];
    let mut pieces = Vec::with_capacity(piece_count as usize);

    for index in 1..=piece_count {
        let name = format!("{}.{:0width$}", basename, index, width = pad_width);
        let path = dest_dir.join(name);
        let mut output = File::create(&path).await?;

        let mut written = 0u64;
        while written < max_piece_size {
            let want = (max_piece_size - written).min(SPLIT_BUF_SIZE as u64) as usize;
            let n = input.read(&mut buf[..want]).await?;
            if n == 0 {
                break;
            }
            output.write_all(&buf[..n]).await?;
            written += n as u64;
        }
        output.flush().await?;

        pieces.push(Piece {
            number: index as u32,
            path,
            size: written,
        });
    }

    Ok(pieces)
}
