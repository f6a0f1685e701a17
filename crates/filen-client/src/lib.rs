//! filen-client: the wire layer.
//!
//! Everything that talks to the service goes through the [`DriveTransport`]
//! trait: the production [`HttpTransport`] (reqwest, bearer auth, retry with
//! exponential backoff) and the [`MemoryTransport`] backend that the test
//! suites run against so no live account is ever needed.

pub mod api;
pub mod auth;
pub mod memory;
pub mod transport;

pub use api::{
    ChunkUploadParams, DirContent, DirCreateRequest, DirRenameRequest, EmptyUploadRequest,
    FileRenameRequest, RawFileInfo, RawFileRecord, RawFolderRecord, UploadDoneRequest,
};
pub use auth::login;
pub use memory::MemoryTransport;
pub use transport::{DriveTransport, HttpTransport};

/// The drive folder listing uuid that addresses the trash.
pub const TRASH_UUID: &str = "trash";
