//! The chunked upload engine.
//!
//! Fresh uploads generate the (file uuid, upload key, file key) triple and
//! hand it to `on_start` *before* the first chunk ships, so the caller can
//! persist resume state that is never behind the server's. A chunk failure
//! surfaces as `ChunkUploadFailed` carrying the triple and the last chunk
//! that made it; re-invoking with that as the resume point re-hashes the
//! uploaded prefix locally (no re-upload) and continues.

use std::path::Path;

use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use filen_client::api::{ChunkUploadParams, EmptyUploadRequest, UploadDoneRequest};
use filen_client::DriveTransport;
use filen_core::{FilenError, Result};
use filen_crypto::envelope::{encrypt_envelope, FileMetadata};
use filen_crypto::{encrypt_chunk, generate_file_key, generate_upload_key, generate_uuid, random_string};
use filen_drive::Drive;

use crate::codec::{chunk_count, chunk_len, content_hash, TotalHasher, CHUNK_SIZE};

/// Chunk-level progress: (chunks done, chunks total, bytes done, bytes total).
pub type ProgressFn = Box<dyn Fn(u32, u32, u64, u64) + Send + Sync>;

/// The durable identity of one in-flight upload. `last_chunk` is -1 when
/// nothing has shipped yet.
#[derive(Debug, Clone)]
pub struct ResumePoint {
    pub file_uuid: String,
    pub upload_key: String,
    pub file_key: String,
    pub last_chunk: i64,
}

pub struct UploadRequest<'a> {
    pub local_path: &'a Path,
    pub parent_uuid: &'a str,
    pub remote_name: &'a str,
    /// Present when continuing an interrupted upload.
    pub resume: Option<ResumePoint>,
    pub created_ms: Option<i64>,
    pub modified_ms: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub file_uuid: String,
    /// Lowercase hex SHA-512 of the full plaintext; empty for empty files.
    pub total_hash: String,
    pub size: u64,
    pub chunks: u32,
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Upload one local file into `parent_uuid` as `remote_name`.
///
/// Call-order guarantee: for a fresh, non-empty upload, `on_start` fires
/// exactly once, before any chunk traffic. It never fires for resumed or
/// empty uploads.
pub async fn upload_file(
    drive: &Drive,
    req: UploadRequest<'_>,
    progress: Option<&ProgressFn>,
    mut on_start: Option<&mut (dyn FnMut(&ResumePoint) + Send)>,
) -> Result<UploadOutcome> {
    let meta = tokio::fs::metadata(req.local_path).await?;
    if !meta.is_file() {
        return Err(anyhow::anyhow!("not a file: {}", req.local_path.display()).into());
    }
    let size = meta.len();
    let chunks = chunk_count(size);
    let mime = mime_guess::from_path(req.remote_name)
        .first_or_octet_stream()
        .to_string();
    let last_modified = req.modified_ms.or(req.created_ms).unwrap_or_else(now_ms);

    if size == 0 {
        return upload_empty(drive, &req, &mime, last_modified).await;
    }

    let (point, resume_from) = match req.resume.clone() {
        Some(point) => {
            let from = (point.last_chunk + 1).max(0) as u32;
            debug!(file_uuid = %point.file_uuid, from, "resuming upload");
            (point, from)
        }
        None => {
            let point = ResumePoint {
                file_uuid: generate_uuid(),
                upload_key: generate_upload_key(),
                file_key: generate_file_key(),
                last_chunk: -1,
            };
            if let Some(cb) = on_start.as_deref_mut() {
                cb(&point);
            }
            (point, 0)
        }
    };

    let mut file = tokio::fs::File::open(req.local_path).await?;
    let mut hasher = TotalHasher::new();
    let mut buf = vec![0u8; CHUNK_SIZE as usize];

    // Total-hash continuation: re-read the already-uploaded prefix so the
    // finalized hash covers the whole plaintext.
    for index in 0..resume_from {
        let want = chunk_len(size, index);
        file.read_exact(&mut buf[..want]).await?;
        hasher.update(&buf[..want]);
    }
    let mut bytes_done = hasher.bytes();

    for index in resume_from..chunks {
        let want = chunk_len(size, index);
        file.read_exact(&mut buf[..want]).await?;
        hasher.update(&buf[..want]);

        let body = encrypt_chunk(&point.file_key, &buf[..want])?;
        let params = ChunkUploadParams {
            file_uuid: point.file_uuid.clone(),
            index,
            parent: req.parent_uuid.to_string(),
            upload_key: point.upload_key.clone(),
            hash: content_hash(&body),
        };
        if let Err(source) = drive.transport().upload_chunk(&params, body).await {
            return Err(FilenError::ChunkUploadFailed {
                file_uuid: point.file_uuid,
                upload_key: point.upload_key,
                file_key: point.file_key,
                last_chunk: index as i64 - 1,
                source: Box::new(source),
            });
        }

        bytes_done += want as u64;
        if let Some(cb) = progress {
            cb(index + 1, chunks, bytes_done, size);
        }
    }

    let total_hash = hasher.finalize_hex();
    let metadata = FileMetadata {
        name: req.remote_name.to_string(),
        size,
        mime: mime.clone(),
        key: point.file_key.clone(),
        hash: total_hash.clone(),
        last_modified,
    };
    drive
        .transport()
        .upload_done(&UploadDoneRequest {
            uuid: point.file_uuid.clone(),
            name: encrypt_envelope(req.remote_name, &point.file_key)?,
            name_hashed: drive.hash_name(req.remote_name),
            size: encrypt_envelope(&size.to_string(), &point.file_key)?,
            chunks,
            mime: encrypt_envelope(&mime, &point.file_key)?,
            rm: random_string(32),
            metadata: metadata.encode(drive.identity().newest_master_key())?,
            version: 2,
            upload_key: point.upload_key.clone(),
        })
        .await?;

    drive.invalidate(req.parent_uuid);
    info!(
        name = %req.remote_name,
        uuid = %point.file_uuid,
        chunks,
        size,
        "upload finalized"
    );

    Ok(UploadOutcome {
        file_uuid: point.file_uuid,
        total_hash,
        size,
        chunks,
    })
}

/// Zero-byte files skip the ingest path entirely: one metadata-only POST,
/// `chunks = 0`, empty hash.
async fn upload_empty(
    drive: &Drive,
    req: &UploadRequest<'_>,
    mime: &str,
    last_modified: i64,
) -> Result<UploadOutcome> {
    let file_uuid = generate_uuid();
    let file_key = generate_file_key();
    let metadata = FileMetadata {
        name: req.remote_name.to_string(),
        size: 0,
        mime: mime.to_string(),
        key: file_key.clone(),
        hash: String::new(),
        last_modified,
    };
    drive
        .transport()
        .upload_empty(&EmptyUploadRequest {
            uuid: file_uuid.clone(),
            name: encrypt_envelope(req.remote_name, &file_key)?,
            name_hashed: drive.hash_name(req.remote_name),
            size: encrypt_envelope("0", &file_key)?,
            parent: req.parent_uuid.to_string(),
            mime: encrypt_envelope(mime, &file_key)?,
            metadata: metadata.encode(drive.identity().newest_master_key())?,
            version: 2,
        })
        .await?;

    drive.invalidate(req.parent_uuid);
    info!(name = %req.remote_name, uuid = %file_uuid, "empty file finalized");
    Ok(UploadOutcome {
        file_uuid,
        total_hash: String::new(),
        size: 0,
        chunks: 0,
    })
}
