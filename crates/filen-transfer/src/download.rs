//! The download engine: fetch, decrypt, stream to disk.
//!
//! Full downloads stream chunk by chunk to the destination writer. Ranged
//! reads fetch only the chunks overlapping `[start, end]` (inclusive) and
//! slice the boundary chunks in memory.

use std::path::Path;

use tokio::io::AsyncWriteExt;
use tracing::info;

use filen_client::DriveTransport;
use filen_core::{FileHandle, FilenError, Result};
use filen_crypto::decrypt_chunk;
use filen_drive::Drive;

use crate::codec::CHUNK_SIZE;
use crate::upload::ProgressFn;

#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub bytes_written: u64,
    pub file_name: String,
    pub modified_ms: Option<i64>,
}

async fn open_dest(dest: &Path) -> Result<tokio::fs::File> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(tokio::fs::File::create(dest).await?)
}

fn require_key(file: &FileHandle) -> Result<()> {
    if file.file_key.is_empty() {
        return Err(FilenError::DecryptFailed);
    }
    Ok(())
}

/// Download a whole file to `dest`.
pub async fn download_file(
    drive: &Drive,
    file: &FileHandle,
    dest: &Path,
    progress: Option<&ProgressFn>,
) -> Result<DownloadOutcome> {
    if file.chunks > 0 {
        require_key(file)?;
    }
    let mut writer = open_dest(dest).await?;
    let mut bytes_written = 0u64;

    for index in 0..file.chunks {
        let body = drive
            .transport()
            .download_chunk(&file.region, &file.bucket, &file.uuid, index)
            .await?;
        let plain = decrypt_chunk(&file.file_key, &body)?;
        writer.write_all(&plain).await?;
        bytes_written += plain.len() as u64;
        if let Some(cb) = progress {
            cb(index + 1, file.chunks, bytes_written, file.size);
        }
    }
    writer.flush().await?;

    info!(name = %file.name, dest = %dest.display(), bytes_written, "downloaded");
    Ok(DownloadOutcome {
        bytes_written,
        file_name: file.name.clone(),
        modified_ms: Some(file.last_modified_ms),
    })
}

/// Download the inclusive byte range `[start, end]` to `dest`.
pub async fn download_range(
    drive: &Drive,
    file: &FileHandle,
    dest: &Path,
    start: u64,
    end: u64,
) -> Result<DownloadOutcome> {
    if start > end || end >= file.size {
        return Err(anyhow::anyhow!(
            "range {start}..={end} out of bounds for {} bytes",
            file.size
        )
        .into());
    }
    require_key(file)?;

    let start_chunk = (start / CHUNK_SIZE) as u32;
    let end_chunk = (end / CHUNK_SIZE) as u32;

    let mut writer = open_dest(dest).await?;
    let mut bytes_written = 0u64;

    for index in start_chunk..=end_chunk {
        let body = drive
            .transport()
            .download_chunk(&file.region, &file.bucket, &file.uuid, index)
            .await?;
        let plain = decrypt_chunk(&file.file_key, &body)?;

        let chunk_offset = index as u64 * CHUNK_SIZE;
        let from = start.saturating_sub(chunk_offset) as usize;
        let to = ((end - chunk_offset) as usize + 1).min(plain.len());
        writer.write_all(&plain[from..to]).await?;
        bytes_written += (to - from) as u64;
    }
    writer.flush().await?;

    Ok(DownloadOutcome {
        bytes_written,
        file_name: file.name.clone(),
        modified_ms: Some(file.last_modified_ms),
    })
}
