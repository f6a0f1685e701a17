//! Durable batch state.
//!
//! A batch is keyed by the first 16 hex characters of
//! `SHA-1(operation-source1|source2-target)`, so re-running the same
//! command finds the same state file and resumes. State lives as JSON under
//! `~/.filen-cli/batch_states/`, written atomically (temp + rename);
//! mid-file progress writes are throttled to every 10 chunks or 5 seconds.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::warn;

use filen_core::{paths, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchOperation {
    Upload,
    Download,
}

impl BatchOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchOperation::Upload => "upload",
            BatchOperation::Download => "download",
        }
    }
}

/// Task state machine. Unit variants serialize as bare strings, the
/// reason-carrying ones as `{"skipped": "conflict"}` / `{"error": "parent"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Uploading,
    Interrupted,
    Completed,
    Skipped(String),
    Error(String),
}

impl TaskStatus {
    /// Finished, nothing left to do on a re-run.
    pub fn is_settled(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Skipped(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTask {
    pub local_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_uuid: Option<String>,
    pub status: TaskStatus,
    /// Resume triple (+ the per-file key, without which resumed chunks
    /// could not share the finalized metadata's key). Set exactly while
    /// the task is Uploading or Interrupted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_key: Option<String>,
    /// Last chunk confirmed by the server; -1 = none.
    pub last_chunk: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_modification_time: Option<i64>,
}

impl BatchTask {
    pub fn new_upload(local_path: PathBuf, remote_path: String) -> Self {
        Self {
            local_path,
            remote_path: Some(remote_path),
            remote_uuid: None,
            status: TaskStatus::Pending,
            file_uuid: None,
            upload_key: None,
            file_key: None,
            last_chunk: -1,
            remote_modification_time: None,
        }
    }

    pub fn new_download(
        local_path: PathBuf,
        remote_path: String,
        remote_uuid: String,
        remote_modification_time: Option<i64>,
    ) -> Self {
        Self {
            local_path,
            remote_path: Some(remote_path),
            remote_uuid: Some(remote_uuid),
            status: TaskStatus::Pending,
            file_uuid: None,
            upload_key: None,
            file_key: None,
            last_chunk: -1,
            remote_modification_time,
        }
    }

    pub fn clear_resume(&mut self) {
        self.file_uuid = None;
        self.upload_key = None;
        self.file_key = None;
        self.last_chunk = -1;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchState {
    pub operation_type: BatchOperation,
    pub target_remote_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_destination: Option<PathBuf>,
    pub tasks: Vec<BatchTask>,
}

impl BatchState {
    /// Every task settled, so the state file can be removed.
    pub fn is_complete(&self) -> bool {
        self.tasks.iter().all(|t| t.status.is_settled())
    }
}

/// Deterministic batch key.
pub fn batch_id(op: BatchOperation, sources: &[String], target: &str) -> String {
    let seed = format!("{}-{}-{}", op.as_str(), sources.join("|"), target);
    let digest = hex::encode(Sha1::digest(seed.as_bytes()));
    digest[..16].to_string()
}

/// Default location for batch state files.
pub fn default_state_dir() -> PathBuf {
    paths::data_dir().join("batch_states")
}

/// Handle to one batch's state file.
#[derive(Debug, Clone)]
pub struct BatchStore {
    path: PathBuf,
}

impl BatchStore {
    pub fn new(dir: &Path, id: &str) -> Self {
        Self {
            path: dir.join(format!("batch_state_{id}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<Option<BatchState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Atomic write: temp file then rename.
    pub fn save(&self, state: &BatchState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Persistence is best-effort mid-transfer: a failed save must not kill
    /// the batch.
    pub fn save_best_effort(&self, state: &BatchState) {
        if let Err(e) = self.save(state) {
            warn!(path = %self.path.display(), "failed to persist batch state: {e}");
        }
    }

    pub fn delete(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// Throttle for mid-file progress persistence: save when ≥ N chunks have
/// passed since the last save, or ≥ the time interval, whichever first.
pub struct SaveThrottle {
    chunk_interval: i64,
    time_interval: Duration,
    last_chunk: i64,
    last_save: Instant,
}

impl SaveThrottle {
    pub fn new(chunk_interval: u32, time_interval: Duration) -> Self {
        Self {
            chunk_interval: chunk_interval as i64,
            time_interval,
            last_chunk: -1,
            last_save: Instant::now(),
        }
    }

    pub fn should_save(&mut self, current_chunk: i64) -> bool {
        if current_chunk - self.last_chunk >= self.chunk_interval
            || self.last_save.elapsed() >= self.time_interval
        {
            self.last_chunk = current_chunk;
            self.last_save = Instant::now();
            true
        } else {
            false
        }
    }
}
