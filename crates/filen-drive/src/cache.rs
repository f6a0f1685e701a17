//! Per-parent TTL cache of decrypted listings.
//!
//! Two keyed maps (folders and files by parent uuid), both filled by one
//! listing fetch and both dropped by one invalidation. Entries older than
//! the TTL are treated as absent. A single lock per map; reads copy out so
//! no lock is ever held across an await.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use filen_core::{FileHandle, FolderHandle};

struct Entry<T> {
    items: Vec<T>,
    inserted_at: Instant,
}

pub struct ListingCache {
    ttl: Duration,
    folders: Mutex<HashMap<String, Entry<FolderHandle>>>,
    files: Mutex<HashMap<String, Entry<FileHandle>>>,
}

impl ListingCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            folders: Mutex::new(HashMap::new()),
            files: Mutex::new(HashMap::new()),
        }
    }

    fn get_from<T: Clone>(
        map: &Mutex<HashMap<String, Entry<T>>>,
        parent: &str,
        ttl: Duration,
    ) -> Option<Vec<T>> {
        let guard = map.lock().unwrap_or_else(|e| e.into_inner());
        let entry = guard.get(parent)?;
        if entry.inserted_at.elapsed() < ttl {
            Some(entry.items.clone())
        } else {
            None
        }
    }

    pub fn get_folders(&self, parent: &str) -> Option<Vec<FolderHandle>> {
        Self::get_from(&self.folders, parent, self.ttl)
    }

    pub fn get_files(&self, parent: &str) -> Option<Vec<FileHandle>> {
        Self::get_from(&self.files, parent, self.ttl)
    }

    /// Store both halves of one listing fetch.
    pub fn put(&self, parent: &str, folders: Vec<FolderHandle>, files: Vec<FileHandle>) {
        let now = Instant::now();
        self.folders
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                parent.to_string(),
                Entry {
                    items: folders,
                    inserted_at: now,
                },
            );
        self.files.lock().unwrap_or_else(|e| e.into_inner()).insert(
            parent.to_string(),
            Entry {
                items: files,
                inserted_at: now,
            },
        );
    }

    /// Remove both maps' entry for a parent.
    pub fn invalidate(&self, parent: &str) {
        self.folders
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(parent);
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(parent);
    }
}
