use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Top-level CLI configuration (loaded from `~/.filen-cli/config.toml`).
///
/// Every field has a default, so a missing or partial file is fine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub transfer: TransferConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Gateway base URL for the JSON API
    pub gateway: String,
    /// Ingest base URL for chunk uploads
    pub ingest: String,
    /// Egest base URL for chunk downloads
    pub egest: String,
    /// Retry attempts for transient transport failures
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Listing cache TTL in seconds (default: 600 = 10 minutes)
    pub listing_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Hard per-chunk upload timeout in seconds
    pub chunk_timeout_secs: u64,
    /// Persist batch progress every N completed chunks
    pub save_chunk_interval: u32,
    /// ... or every N seconds, whichever comes first
    pub save_interval_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            gateway: "https://gateway.filen.io".into(),
            ingest: "https://ingest.filen.io".into(),
            egest: "https://egest.filen.io".into(),
            max_retries: 3,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            listing_ttl_secs: 600,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_timeout_secs: 30,
            save_chunk_interval: 10,
            save_interval_secs: 5,
        }
    }
}

impl CliConfig {
    /// Load from a TOML file, falling back to defaults when absent.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("parsing config {}: {e}", path.display()).into())
        } else {
            Ok(Self::default())
        }
    }
}
