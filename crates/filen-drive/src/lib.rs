//! filen-drive: the decrypted view of the remote drive.
//!
//! [`Drive`] wraps a transport with the session identity and turns
//! ciphertext listings into named handles, caches them per parent folder,
//! resolves POSIX paths, and performs every metadata mutation (create,
//! move, rename, trash, restore, delete). Content transfer lives one crate
//! up in filen-transfer.

pub mod cache;
pub mod ops;
pub mod resolve;
pub mod walk;

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use filen_client::api::{RawFileRecord, RawFolderRecord};
use filen_client::{DriveTransport, TRASH_UUID};
use filen_core::types::ENCRYPTED_PLACEHOLDER;
use filen_core::{DriveItem, FileHandle, FolderHandle, Identity, Result};
use filen_crypto::envelope::{decode_file_metadata, decode_folder_name};
use filen_crypto::NameHasher;

use cache::ListingCache;

pub use resolve::ResolvedItem;
pub use walk::FoundFile;

pub struct Drive {
    transport: Arc<dyn DriveTransport>,
    identity: Identity,
    hasher: NameHasher,
    cache: ListingCache,
}

impl Drive {
    pub fn new(
        transport: Arc<dyn DriveTransport>,
        identity: Identity,
        listing_ttl: Duration,
    ) -> Self {
        let hasher = NameHasher::new(identity.newest_master_key(), &identity.email);
        Self {
            transport,
            identity,
            hasher,
            cache: ListingCache::new(listing_ttl),
        }
    }

    pub fn transport(&self) -> &Arc<dyn DriveTransport> {
        &self.transport
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn base_folder(&self) -> &str {
        &self.identity.base_folder_uuid
    }

    /// Server-side lookup hash for a plaintext name.
    pub fn hash_name(&self, name: &str) -> String {
        self.hasher.hash(name)
    }

    /// Drop the cached listing of one parent. Every mutation calls this for
    /// the affected parent(s) before returning to the caller.
    pub fn invalidate(&self, parent: &str) {
        self.cache.invalidate(parent);
    }

    /// Folders directly under `parent`, via the cache.
    pub async fn folders_under(&self, parent: &str) -> Result<Vec<FolderHandle>> {
        if let Some(folders) = self.cache.get_folders(parent) {
            return Ok(folders);
        }
        let (folders, _) = self.refresh(parent).await?;
        Ok(folders)
    }

    /// Files directly under `parent`, via the cache.
    pub async fn files_under(&self, parent: &str) -> Result<Vec<FileHandle>> {
        if let Some(files) = self.cache.get_files(parent) {
            return Ok(files);
        }
        let (_, files) = self.refresh(parent).await?;
        Ok(files)
    }

    /// Full listing of a folder for display: folders before files, each
    /// group sorted case-insensitively by name.
    pub async fn list(&self, parent: &str) -> Result<Vec<DriveItem>> {
        let mut folders = self.folders_under(parent).await?;
        let mut files = self.files_under(parent).await?;
        sort_for_display(&mut folders, folder_name);
        sort_for_display(&mut files, file_name);
        Ok(folders
            .into_iter()
            .map(DriveItem::Folder)
            .chain(files.into_iter().map(DriveItem::File))
            .collect())
    }

    /// Trash contents. Never cached: the trash is not a path-addressable
    /// parent and listings of it are rare.
    pub async fn list_trash(&self) -> Result<Vec<DriveItem>> {
        let content = self.transport.dir_content(TRASH_UUID).await?;
        let mut folders: Vec<FolderHandle> = content
            .folders
            .iter()
            .map(|raw| self.decrypt_folder(raw))
            .collect();
        let mut files: Vec<FileHandle> =
            content.uploads.iter().map(|raw| self.decrypt_file(raw)).collect();
        sort_for_display(&mut folders, folder_name);
        sort_for_display(&mut files, file_name);
        Ok(folders
            .into_iter()
            .map(DriveItem::Folder)
            .chain(files.into_iter().map(DriveItem::File))
            .collect())
    }

    /// Fetch one parent's listing, decrypt it, and store both cache maps.
    async fn refresh(&self, parent: &str) -> Result<(Vec<FolderHandle>, Vec<FileHandle>)> {
        let content = self.transport.dir_content(parent).await?;
        let folders: Vec<FolderHandle> = content
            .folders
            .iter()
            .map(|raw| self.decrypt_folder(raw))
            .collect();
        let files: Vec<FileHandle> =
            content.uploads.iter().map(|raw| self.decrypt_file(raw)).collect();
        self.cache.put(parent, folders.clone(), files.clone());
        Ok((folders, files))
    }

    fn decrypt_folder(&self, raw: &RawFolderRecord) -> FolderHandle {
        let name = match decode_folder_name(&raw.name, &self.identity.master_keys) {
            Ok(name) => name,
            Err(_) => {
                warn!(uuid = %raw.uuid, "folder name did not decrypt with any master key");
                ENCRYPTED_PLACEHOLDER.to_string()
            }
        };
        FolderHandle {
            uuid: raw.uuid.clone(),
            parent: Some(raw.parent.clone()),
            name,
            timestamp: raw.timestamp,
        }
    }

    fn decrypt_file(&self, raw: &RawFileRecord) -> FileHandle {
        match decode_file_metadata(&raw.metadata, &self.identity.master_keys) {
            Ok(meta) => FileHandle {
                uuid: raw.uuid.clone(),
                parent: raw.parent.clone(),
                name: meta.name,
                size: meta.size,
                chunks: raw.chunks,
                mime: meta.mime,
                file_key: meta.key,
                total_hash: meta.hash,
                last_modified_ms: if meta.last_modified > 0 {
                    meta.last_modified
                } else {
                    raw.timestamp
                },
                region: raw.region.clone(),
                bucket: raw.bucket.clone(),
            },
            Err(_) => {
                warn!(uuid = %raw.uuid, "file metadata did not decrypt with any master key");
                FileHandle {
                    uuid: raw.uuid.clone(),
                    parent: raw.parent.clone(),
                    name: ENCRYPTED_PLACEHOLDER.to_string(),
                    size: 0,
                    chunks: raw.chunks,
                    mime: String::new(),
                    file_key: String::new(),
                    total_hash: String::new(),
                    last_modified_ms: raw.timestamp,
                    region: raw.region.clone(),
                    bucket: raw.bucket.clone(),
                }
            }
        }
    }

    /// Fetch a single file record by uuid and decrypt its metadata.
    pub async fn fetch_file(&self, uuid: &str) -> Result<FileHandle> {
        let info = self.transport.file_info(uuid).await?;
        let meta = decode_file_metadata(&info.metadata, &self.identity.master_keys)?;
        Ok(FileHandle {
            uuid: uuid.to_string(),
            parent: info.parent,
            name: meta.name,
            size: meta.size,
            chunks: info.chunks,
            mime: meta.mime,
            file_key: meta.key,
            total_hash: meta.hash,
            last_modified_ms: meta.last_modified,
            region: info.region,
            bucket: info.bucket,
        })
    }
}

fn folder_name(f: &FolderHandle) -> &str {
    &f.name
}

fn file_name(f: &FileHandle) -> &str {
    &f.name
}

/// Display order within a group: case-insensitive by name, exact name as
/// the tie-break. Deterministic across runs.
fn sort_for_display<T>(items: &mut [T], name: fn(&T) -> &str) {
    items.sort_by(|a, b| {
        name(a)
            .to_lowercase()
            .cmp(&name(b).to_lowercase())
            .then_with(|| name(a).cmp(name(b)))
    });
}
