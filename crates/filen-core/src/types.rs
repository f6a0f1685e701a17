use zeroize::Zeroize;

/// Authenticated session state, created at login and immutable afterwards.
///
/// `master_keys` is ordered oldest→newest: the last key encrypts all new
/// metadata, every key is a decryption candidate (newest tried first).
/// Keys are wiped from memory on drop.
#[derive(Clone)]
pub struct Identity {
    pub email: String,
    pub api_key: String,
    pub master_keys: Vec<String>,
    pub base_folder_uuid: String,
    pub user_id: u64,
}

impl Identity {
    /// The most recent master key, the one that encrypts new envelopes.
    pub fn newest_master_key(&self) -> &str {
        self.master_keys
            .last()
            .map(String::as_str)
            .unwrap_or_default()
    }
}

impl Drop for Identity {
    fn drop(&mut self) {
        for key in &mut self.master_keys {
            key.zeroize();
        }
        self.api_key.zeroize();
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("email", &self.email)
            .field("api_key", &"[REDACTED]")
            .field("master_keys", &format!("[{} keys]", self.master_keys.len()))
            .field("base_folder_uuid", &self.base_folder_uuid)
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Folder,
    File,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemKind::Folder => write!(f, "folder"),
            ItemKind::File => write!(f, "file"),
        }
    }
}

/// Placeholder name used when an item's envelope defeats every master key.
pub const ENCRYPTED_PLACEHOLDER: &str = "[Encrypted]";

/// A folder whose name decrypted successfully (or the root, which has no
/// ciphertext at all). The root has `parent: None`.
#[derive(Debug, Clone)]
pub struct FolderHandle {
    pub uuid: String,
    pub parent: Option<String>,
    pub name: String,
    /// Server-side creation timestamp, as received.
    pub timestamp: i64,
}

/// A file handle materialized from a listing entry whose metadata envelope
/// decrypted successfully.
///
/// Immutable after upload-finalize except `name` (rename re-encrypts the
/// metadata) and `parent` (move).
#[derive(Debug, Clone)]
pub struct FileHandle {
    pub uuid: String,
    pub parent: String,
    pub name: String,
    pub size: u64,
    pub chunks: u32,
    pub mime: String,
    /// 32-character ASCII per-file key; empty when decryption failed.
    pub file_key: String,
    /// Lowercase hex SHA-512 of the plaintext; empty for empty files and
    /// for records finalized without a hash.
    pub total_hash: String,
    pub last_modified_ms: i64,
    pub region: String,
    pub bucket: String,
}

impl FileHandle {
    /// Whether the metadata envelope failed to decrypt. Such items are shown
    /// as `[Encrypted]` in listings and any content operation on them fails.
    pub fn is_opaque(&self) -> bool {
        self.file_key.is_empty() && self.name == ENCRYPTED_PLACEHOLDER
    }
}

/// One decrypted listing entry.
#[derive(Debug, Clone)]
pub enum DriveItem {
    Folder(FolderHandle),
    File(FileHandle),
}

impl DriveItem {
    pub fn name(&self) -> &str {
        match self {
            DriveItem::Folder(f) => &f.name,
            DriveItem::File(f) => &f.name,
        }
    }

    pub fn uuid(&self) -> &str {
        match self {
            DriveItem::Folder(f) => &f.uuid,
            DriveItem::File(f) => &f.uuid,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            DriveItem::Folder(_) => ItemKind::Folder,
            DriveItem::File(_) => ItemKind::File,
        }
    }
}
