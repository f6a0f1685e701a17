use thiserror::Error;

pub type Result<T> = std::result::Result<T, FilenError>;

/// Two-factor challenge codes surfaced by the login endpoint.
///
/// These must stay distinguishable so the CLI can re-prompt for a code
/// instead of failing the whole login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoFactorChallenge {
    /// The account requires a 2FA code (`enter_2fa`).
    Required,
    /// The supplied 2FA code was rejected (`wrong_2fa`).
    Wrong,
}

impl std::fmt::Display for TwoFactorChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TwoFactorChallenge::Required => write!(f, "two-factor code required"),
            TwoFactorChallenge::Wrong => write!(f, "two-factor code rejected"),
        }
    }
}

#[derive(Debug, Error)]
pub enum FilenError {
    #[error("not logged in (run `filen login` first)")]
    AuthMissing,

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("{0}")]
    AuthChallenge(TwoFactorChallenge),

    /// A network-level failure that survived the retry schedule.
    #[error("network error: {0}")]
    Network(String),

    #[error("server returned HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// The API envelope came back with `status: false`.
    #[error("API error: {message}")]
    Api {
        message: String,
        code: Option<String>,
    },

    #[error("could not decrypt metadata with any master key")]
    DecryptFailed,

    #[error("no such remote path: {0}")]
    PathNotFound(String),

    /// A chunk upload died mid-file. Carries everything needed to resume
    /// from `last_chunk + 1` without re-uploading finished chunks.
    #[error("chunk upload failed after chunk {last_chunk}: {source}")]
    ChunkUploadFailed {
        file_uuid: String,
        upload_key: String,
        file_key: String,
        last_chunk: i64,
        #[source]
        source: Box<FilenError>,
    },

    #[error("integrity mismatch: local hash {local} does not match remote hash {remote}")]
    IntegrityMismatch { local: String, remote: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FilenError {
    /// True for the 409 / "already exists" family that `mkdir -p` treats as
    /// a lost creation race rather than a failure.
    pub fn is_already_exists(&self) -> bool {
        match self {
            FilenError::HttpStatus { status: 409, .. } => true,
            FilenError::Api { message, code } => {
                code.as_deref() == Some("folder_exists")
                    || message.to_lowercase().contains("already exists")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_exists_classification() {
        assert!(FilenError::HttpStatus {
            status: 409,
            message: "conflict".into()
        }
        .is_already_exists());
        assert!(FilenError::Api {
            message: "Folder already exists.".into(),
            code: None
        }
        .is_already_exists());
        assert!(!FilenError::HttpStatus {
            status: 404,
            message: "not found".into()
        }
        .is_already_exists());
        assert!(!FilenError::DecryptFailed.is_already_exists());
    }

    #[test]
    fn chunk_upload_failed_preserves_resume_fields() {
        let err = FilenError::ChunkUploadFailed {
            file_uuid: "uuid-1".into(),
            upload_key: "key-1".into(),
            file_key: "fk".into(),
            last_chunk: 3,
            source: Box::new(FilenError::Network("timeout".into())),
        };
        let msg = err.to_string();
        assert!(msg.contains("after chunk 3"), "got: {msg}");
    }
}
