//! Metadata mutations: create, move, rename, trash, restore, delete.
//!
//! Every mutation invalidates the affected parent listings before it
//! returns, so the next resolution sees the change (source *and*
//! destination parent for moves).

use std::time::Duration;

use tracing::{debug, info, warn};

use filen_client::api::{DirCreateRequest, DirRenameRequest, FileRenameRequest};
use filen_client::DriveTransport;
use filen_core::{paths, DriveItem, FilenError, ItemKind, Result};
use filen_crypto::envelope::{encode_folder_name, encrypt_envelope, FileMetadata};
use filen_crypto::rng::generate_uuid;

use crate::resolve::ResolvedItem;
use crate::Drive;

impl Drive {
    /// `mkdir -p`: walk the path, creating every missing component. Returns
    /// the uuid of the final folder. Only the final component carries the
    /// optional timestamps.
    pub async fn mkdir_p(
        &self,
        path: &str,
        created_ms: Option<i64>,
        modified_ms: Option<i64>,
    ) -> Result<String> {
        let normalized = paths::normalize(path);
        let comps = paths::components(&normalized);
        let mut parent_uuid = self.base_folder().to_string();

        for (i, comp) in comps.iter().enumerate() {
            let is_last = i + 1 == comps.len();
            let folders = self.folders_under(&parent_uuid).await?;
            if let Some(existing) = folders.iter().find(|f| &f.name == comp) {
                parent_uuid = existing.uuid.clone();
                continue;
            }

            let req = DirCreateRequest {
                uuid: generate_uuid(),
                name: encode_folder_name(comp, self.identity().newest_master_key())?,
                name_hashed: self.hash_name(comp),
                parent: parent_uuid.clone(),
                creation_time: if is_last { created_ms } else { None },
                modification_time: if is_last { modified_ms } else { None },
            };

            match self.transport().dir_create(&req).await {
                Ok(()) => {
                    debug!(name = %comp, uuid = %req.uuid, "created folder");
                    self.invalidate(&parent_uuid);
                    parent_uuid = req.uuid;
                }
                Err(err) if err.is_already_exists() => {
                    // Lost a creation race. Let the server settle, then adopt
                    // the winning folder (last writer is deterministic).
                    warn!(name = %comp, "folder creation raced, re-listing");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    self.invalidate(&parent_uuid);
                    let folders = self.folders_under(&parent_uuid).await?;
                    let winner = folders.into_iter().find(|f| &f.name == comp).ok_or_else(|| {
                        FilenError::PathNotFound(format!("/{}", comps[..=i].join("/")))
                    })?;
                    parent_uuid = winner.uuid;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(parent_uuid)
    }

    /// Move an item into another folder. A no-op when source and
    /// destination parents are equal.
    pub async fn move_item(&self, source: &str, dest_folder: &str) -> Result<()> {
        let item = self.resolve(source).await?;
        let dest = self.resolve_folder(dest_folder).await?;
        let source_parent = item
            .parent()
            .ok_or_else(|| anyhow::anyhow!("cannot move the root folder"))?
            .to_string();

        if source_parent == dest.uuid {
            debug!(source, "move is a no-op (same parent)");
            return Ok(());
        }

        self.transport()
            .item_move(item.kind(), item.uuid(), &dest.uuid)
            .await?;
        self.invalidate(&source_parent);
        self.invalidate(&dest.uuid);
        info!(source, dest = dest_folder, "moved");
        Ok(())
    }

    /// Rename in place. Folders re-seal only the name record; files re-seal
    /// the name under the file key and the whole metadata envelope under
    /// the newest master key.
    pub async fn rename(&self, path: &str, new_name: &str) -> Result<()> {
        let item = self.resolve(path).await?;
        let name_hashed = self.hash_name(new_name);

        match &item {
            ResolvedItem::Folder(folder) => {
                if folder.parent.is_none() {
                    return Err(anyhow::anyhow!("cannot rename the root folder").into());
                }
                self.transport()
                    .dir_rename(&DirRenameRequest {
                        uuid: folder.uuid.clone(),
                        name: encode_folder_name(new_name, self.identity().newest_master_key())?,
                        name_hashed,
                    })
                    .await?;
            }
            ResolvedItem::File(file) => {
                if file.file_key.is_empty() {
                    return Err(FilenError::DecryptFailed);
                }
                let metadata = FileMetadata {
                    name: new_name.to_string(),
                    size: file.size,
                    mime: file.mime.clone(),
                    key: file.file_key.clone(),
                    hash: file.total_hash.clone(),
                    last_modified: file.last_modified_ms,
                };
                self.transport()
                    .file_rename(&FileRenameRequest {
                        uuid: file.uuid.clone(),
                        name: encrypt_envelope(new_name, &file.file_key)?,
                        name_hashed,
                        metadata: metadata.encode(self.identity().newest_master_key())?,
                    })
                    .await?;
            }
        }

        if let Some(parent) = item.parent() {
            self.invalidate(parent);
        }
        info!(path, new_name, "renamed");
        Ok(())
    }

    /// Move an item to the trash.
    pub async fn trash(&self, path: &str) -> Result<()> {
        let item = self.resolve(path).await?;
        let parent = item.parent().map(str::to_string);
        self.transport().item_trash(item.kind(), item.uuid()).await?;
        if let Some(parent) = parent {
            self.invalidate(&parent);
        }
        info!(path, "trashed");
        Ok(())
    }

    /// Restore a trashed item by its decrypted name. Restores to the
    /// original parent; the endpoint takes no target. Folders win a name
    /// tie, matching path resolution.
    pub async fn restore_from_trash(&self, name: &str) -> Result<()> {
        let trash = self.list_trash().await?;
        let item = trash
            .iter()
            .find(|i| matches!(i, DriveItem::Folder(_)) && i.name() == name)
            .or_else(|| trash.iter().find(|i| i.name() == name))
            .ok_or_else(|| FilenError::PathNotFound(format!("trash:/{name}")))?;

        self.transport().item_restore(item.kind(), item.uuid()).await?;
        let parent = match item {
            DriveItem::Folder(f) => f.parent.clone(),
            DriveItem::File(f) => Some(f.parent.clone()),
        };
        if let Some(parent) = parent {
            self.invalidate(&parent);
        }
        info!(name, "restored from trash");
        Ok(())
    }

    /// Permanently delete an item, bypassing or emptying its trash entry.
    pub async fn delete_permanent(&self, path: &str) -> Result<()> {
        let item = self.resolve(path).await?;
        let parent = item.parent().map(str::to_string);
        self.transport()
            .item_delete_permanent(item.kind(), item.uuid())
            .await?;
        if let Some(parent) = parent {
            self.invalidate(&parent);
        }
        info!(path, "permanently deleted");
        Ok(())
    }
}
