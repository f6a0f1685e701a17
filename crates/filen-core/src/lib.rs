//! filen-core: shared foundation for the filen CLI workspace
//!
//! Holds the pieces every other crate needs: the error enum, the domain
//! types (identity, folder/file handles), the TOML configuration, the
//! on-disk credential store, and remote-path string helpers.

pub mod config;
pub mod credentials;
pub mod error;
pub mod paths;
pub mod types;

pub use config::CliConfig;
pub use credentials::StoredCredentials;
pub use error::{FilenError, Result, TwoFactorChallenge};
pub use types::{DriveItem, FileHandle, FolderHandle, Identity, ItemKind};
