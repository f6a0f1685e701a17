//! Integrity verification and file copy.
//!
//! `verify` never downloads: it streams the local file through SHA-512 and
//! compares against the hash the server recorded at finalize. `copy` is the
//! only content operation composed of the other two engines: download to a
//! temp file, re-upload under the destination name. Folder copy is
//! unsupported, full stop.

use filen_core::{paths, FilenError, Result};
use filen_crypto::random_string;
use filen_drive::{Drive, ResolvedItem};

use crate::codec::hash_local_file;
use crate::download::download_file;
use crate::upload::{upload_file, UploadOutcome, UploadRequest};

/// Compare a local file's SHA-512 against the remote record's hash.
/// Returns the matching hash, or `IntegrityMismatch`.
pub async fn verify_file(
    drive: &Drive,
    remote_path: &str,
    local_path: &std::path::Path,
) -> Result<String> {
    let file = drive.resolve_file(remote_path).await?;
    let (local_hash, _) = hash_local_file(local_path).await?;
    if local_hash == file.total_hash {
        Ok(local_hash)
    } else {
        Err(FilenError::IntegrityMismatch {
            local: local_hash,
            remote: file.total_hash,
        })
    }
}

/// Server-side copy does not exist; round-trip the content through a local
/// temp file. `dest` may be an existing folder (keeps the source name) or a
/// full target path.
pub async fn copy_file(drive: &Drive, source: &str, dest: &str) -> Result<UploadOutcome> {
    let file = match drive.resolve(source).await? {
        ResolvedItem::File(file) => file,
        ResolvedItem::Folder(_) => {
            return Err(anyhow::anyhow!("copying folders is not supported").into())
        }
    };

    let (parent_path, name) = match drive.resolve(dest).await {
        Ok(ResolvedItem::Folder(_)) => (paths::normalize(dest), file.name.clone()),
        _ => {
            let (parent, name) = paths::parent_and_name(dest);
            match name {
                Some(name) => (parent, name),
                None => ("/".to_string(), file.name.clone()),
            }
        }
    };
    let parent_uuid = drive.mkdir_p(&parent_path, None, None).await?;

    let tmp = std::env::temp_dir().join(format!("filen-cp-{}", random_string(12)));
    download_file(drive, &file, &tmp, None).await?;
    let outcome = upload_file(
        drive,
        UploadRequest {
            local_path: &tmp,
            parent_uuid: &parent_uuid,
            remote_name: &name,
            resume: None,
            created_ms: None,
            modified_ms: Some(file.last_modified_ms),
        },
        None,
        None,
    )
    .await;
    let _ = tokio::fs::remove_file(&tmp).await;
    outcome
}
