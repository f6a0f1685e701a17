//! Persisted login state at `~/.filen-cli/credentials.json`.
//!
//! Master keys are stored pipe-joined in plaintext; the file lives in the
//! user's home directory with the same trust assumptions as an SSH key.
//! Writes go through a temp file + rename so a crash never leaves a
//! truncated credentials file behind.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{FilenError, Result};
use crate::paths;
use crate::types::Identity;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredentials {
    pub email: String,
    pub api_key: String,
    /// Pipe-joined plaintext master keys, oldest first.
    pub master_keys: String,
    #[serde(rename = "baseFolderUUID")]
    pub base_folder_uuid: String,
    pub user_id: u64,
}

impl StoredCredentials {
    pub fn default_path() -> PathBuf {
        paths::data_dir().join("credentials.json")
    }

    pub fn from_identity(identity: &Identity) -> Self {
        Self {
            email: identity.email.clone(),
            api_key: identity.api_key.clone(),
            master_keys: identity.master_keys.join("|"),
            base_folder_uuid: identity.base_folder_uuid.clone(),
            user_id: identity.user_id,
        }
    }

    /// Rehydrate the session identity. Fails with `AuthMissing` when the
    /// stored api key is empty.
    pub fn into_identity(self) -> Result<Identity> {
        if self.api_key.is_empty() {
            return Err(FilenError::AuthMissing);
        }
        Ok(Identity {
            email: self.email,
            api_key: self.api_key,
            master_keys: self
                .master_keys
                .split('|')
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect(),
            base_folder_uuid: self.base_folder_uuid,
            user_id: self.user_id,
        })
    }

    /// Load stored credentials, `None` when no file exists.
    pub fn load(path: &std::path::Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Persist atomically (temp file + rename).
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Delete the stored credentials. Returns whether a file was removed.
    pub fn delete(path: &std::path::Path) -> Result<bool> {
        if path.exists() {
            std::fs::remove_file(path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
