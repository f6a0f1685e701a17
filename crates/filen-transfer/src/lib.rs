//! filen-transfer: content transfer and durable batches.
//!
//! The chunk codec and the upload/download engines move bytes one chunk at
//! a time, sequentially; the batch controller wraps them with durable task
//! state so an interrupted invocation resumes instead of restarting. One
//! file at a time, one chunk at a time: state stays trivially consistent
//! and a kill at any point loses at most the unpersisted tail of progress.

pub mod batch;
pub mod codec;
pub mod download;
pub mod state;
pub mod upload;
pub mod verify;

pub use batch::{BatchController, BatchOptions, BatchSummary, ConflictPolicy};
pub use codec::{chunk_count, content_hash, TotalHasher, CHUNK_SIZE};
pub use download::{download_file, download_range, DownloadOutcome};
pub use state::{batch_id, BatchOperation, BatchState, BatchStore, BatchTask, TaskStatus};
pub use upload::{upload_file, ProgressFn, ResumePoint, UploadOutcome, UploadRequest};
pub use verify::{copy_file, verify_file};
