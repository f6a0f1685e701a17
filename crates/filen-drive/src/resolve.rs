//! POSIX path → remote identifier.
//!
//! Walks the components of a path against cached listings. Matching is
//! case-sensitive (the server's name hashing lowercases, but the plaintext
//! comparison here is exact). When a folder and a file share a name at the
//! terminal component, the folder wins.

use filen_core::{paths, FileHandle, FilenError, FolderHandle, ItemKind, Result};

use crate::Drive;

/// A resolved path: either a folder (the root included) or a file.
#[derive(Debug, Clone)]
pub enum ResolvedItem {
    Folder(FolderHandle),
    File(FileHandle),
}

impl ResolvedItem {
    pub fn kind(&self) -> ItemKind {
        match self {
            ResolvedItem::Folder(_) => ItemKind::Folder,
            ResolvedItem::File(_) => ItemKind::File,
        }
    }

    pub fn uuid(&self) -> &str {
        match self {
            ResolvedItem::Folder(f) => &f.uuid,
            ResolvedItem::File(f) => &f.uuid,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ResolvedItem::Folder(f) => &f.name,
            ResolvedItem::File(f) => &f.name,
        }
    }

    /// Parent folder uuid; `None` only for the root.
    pub fn parent(&self) -> Option<&str> {
        match self {
            ResolvedItem::Folder(f) => f.parent.as_deref(),
            ResolvedItem::File(f) => Some(&f.parent),
        }
    }
}

impl Drive {
    /// The root as a folder handle.
    pub fn root_handle(&self) -> FolderHandle {
        FolderHandle {
            uuid: self.base_folder().to_string(),
            parent: None,
            name: String::new(),
            timestamp: 0,
        }
    }

    /// Resolve a POSIX path to its remote item.
    pub async fn resolve(&self, path: &str) -> Result<ResolvedItem> {
        let normalized = paths::normalize(path);
        let comps = paths::components(&normalized);
        if comps.is_empty() {
            return Ok(ResolvedItem::Folder(self.root_handle()));
        }

        let mut parent_uuid = self.base_folder().to_string();
        for (i, comp) in comps.iter().enumerate() {
            let is_last = i + 1 == comps.len();
            let partial = format!("/{}", comps[..=i].join("/"));

            let folders = self.folders_under(&parent_uuid).await?;
            if let Some(folder) = folders.into_iter().find(|f| &f.name == comp) {
                if is_last {
                    return Ok(ResolvedItem::Folder(folder));
                }
                parent_uuid = folder.uuid;
                continue;
            }

            if is_last {
                let files = self.files_under(&parent_uuid).await?;
                if let Some(file) = files.into_iter().find(|f| &f.name == comp) {
                    return Ok(ResolvedItem::File(file));
                }
            }
            return Err(FilenError::PathNotFound(partial));
        }
        unreachable!("component loop always returns");
    }

    /// Resolve a path that must be a folder.
    pub async fn resolve_folder(&self, path: &str) -> Result<FolderHandle> {
        match self.resolve(path).await? {
            ResolvedItem::Folder(folder) => Ok(folder),
            ResolvedItem::File(_) => {
                Err(anyhow::anyhow!("not a folder: {}", paths::normalize(path)).into())
            }
        }
    }

    /// Resolve a path that must be a file.
    pub async fn resolve_file(&self, path: &str) -> Result<FileHandle> {
        match self.resolve(path).await? {
            ResolvedItem::File(file) => Ok(file),
            ResolvedItem::Folder(_) => {
                Err(anyhow::anyhow!("not a file: {}", paths::normalize(path)).into())
            }
        }
    }
}
