//! In-memory drive backend.
//!
//! Implements [`DriveTransport`] over process-local maps so the resolver,
//! path operations, and the transfer engines can be exercised end-to-end
//! without a live account. It fills the same role the object-store's memory service
//! plays in a storage stack's tests. It keeps ciphertext opaque exactly like
//! the real server: names and metadata go in and come out as envelopes.
//!
//! Fault injection: [`MemoryTransport::fail_chunk_uploads_at`] makes chunk
//! POSTs with `index >= n` fail with a network error, which is how the
//! resume tests simulate a crash mid-file.

use async_trait::async_trait;
use sha2::{Digest, Sha512};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use filen_core::{FilenError, ItemKind, Result};

use crate::api::{
    ChunkUploadParams, DirContent, DirCreateRequest, DirRenameRequest, EmptyUploadRequest,
    FileRenameRequest, RawFileInfo, RawFileRecord, RawFolderRecord, UploadDoneRequest,
};
use crate::transport::DriveTransport;
use crate::TRASH_UUID;

const MEM_REGION: &str = "mem-1";
const MEM_BUCKET: &str = "filen-mem";

#[derive(Debug, Clone)]
struct FolderRec {
    uuid: String,
    name_cipher: String,
    name_hashed: String,
    parent: String,
    timestamp: i64,
}

#[derive(Debug, Clone)]
struct FileRec {
    uuid: String,
    metadata_cipher: String,
    #[allow(dead_code)]
    name_hashed: String,
    parent: String,
    chunks: u32,
    timestamp: i64,
}

#[derive(Debug, Default)]
struct StagedUpload {
    file_uuid: String,
    parent: String,
    chunks: HashMap<u32, Vec<u8>>,
}

#[derive(Default)]
struct MemState {
    folders: HashMap<String, FolderRec>,
    files: HashMap<String, FileRec>,
    /// Committed chunk bodies keyed by (file uuid, index).
    chunks: HashMap<(String, u32), Vec<u8>>,
    /// In-flight uploads keyed by upload key.
    staged: HashMap<String, StagedUpload>,
    trashed: HashSet<String>,
}

#[derive(Default)]
pub struct MemoryTransport {
    state: Mutex<MemState>,
    fail_chunks_at: Mutex<Option<u32>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every chunk POST with `index >= n` fail until cleared.
    pub fn fail_chunk_uploads_at(&self, index: Option<u32>) {
        *self.fail_chunks_at.lock().unwrap() = index;
    }

    /// Number of committed (finalized) files.
    pub fn file_count(&self) -> usize {
        self.state.lock().unwrap().files.len()
    }

    /// Committed chunk count for one file.
    pub fn committed_chunks(&self, file_uuid: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .chunks
            .keys()
            .filter(|(uuid, _)| uuid == file_uuid)
            .count()
    }

    /// Whether an upload key still has uncommitted staged chunks.
    pub fn has_staged(&self, upload_key: &str) -> bool {
        self.state.lock().unwrap().staged.contains_key(upload_key)
    }

    fn folder_to_record(rec: &FolderRec) -> RawFolderRecord {
        RawFolderRecord {
            uuid: rec.uuid.clone(),
            name: rec.name_cipher.clone(),
            parent: rec.parent.clone(),
            timestamp: rec.timestamp,
            last_modified: Some(rec.timestamp),
        }
    }

    fn file_to_record(rec: &FileRec) -> RawFileRecord {
        RawFileRecord {
            uuid: rec.uuid.clone(),
            metadata: rec.metadata_cipher.clone(),
            parent: rec.parent.clone(),
            timestamp: rec.timestamp,
            region: MEM_REGION.to_string(),
            bucket: MEM_BUCKET.to_string(),
            chunks: rec.chunks,
        }
    }

    fn now_ms() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }
}

fn not_found(what: &str) -> FilenError {
    FilenError::HttpStatus {
        status: 404,
        message: format!("{what} not found"),
    }
}

#[async_trait]
impl DriveTransport for MemoryTransport {
    async fn dir_content(&self, uuid: &str) -> Result<DirContent> {
        let state = self.state.lock().unwrap();
        let mut content = DirContent::default();
        if uuid == TRASH_UUID {
            for rec in state.folders.values().filter(|f| state.trashed.contains(&f.uuid)) {
                content.folders.push(Self::folder_to_record(rec));
            }
            for rec in state.files.values().filter(|f| state.trashed.contains(&f.uuid)) {
                content.uploads.push(Self::file_to_record(rec));
            }
        } else {
            for rec in state
                .folders
                .values()
                .filter(|f| f.parent == uuid && !state.trashed.contains(&f.uuid))
            {
                content.folders.push(Self::folder_to_record(rec));
            }
            for rec in state
                .files
                .values()
                .filter(|f| f.parent == uuid && !state.trashed.contains(&f.uuid))
            {
                content.uploads.push(Self::file_to_record(rec));
            }
        }
        Ok(content)
    }

    async fn file_info(&self, uuid: &str) -> Result<RawFileInfo> {
        let state = self.state.lock().unwrap();
        let rec = state.files.get(uuid).ok_or_else(|| not_found("file"))?;
        Ok(RawFileInfo {
            metadata: rec.metadata_cipher.clone(),
            chunks: rec.chunks,
            region: MEM_REGION.to_string(),
            bucket: MEM_BUCKET.to_string(),
            parent: rec.parent.clone(),
        })
    }

    async fn file_exists(&self, parent: &str, name_hashed: &str) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(state.files.values().any(|f| {
            f.parent == parent && f.name_hashed == name_hashed && !state.trashed.contains(&f.uuid)
        }))
    }

    async fn dir_create(&self, req: &DirCreateRequest) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let clash = state.folders.values().any(|f| {
            f.parent == req.parent
                && f.name_hashed == req.name_hashed
                && !state.trashed.contains(&f.uuid)
        });
        if clash {
            return Err(FilenError::HttpStatus {
                status: 409,
                message: "folder already exists".to_string(),
            });
        }
        state.folders.insert(
            req.uuid.clone(),
            FolderRec {
                uuid: req.uuid.clone(),
                name_cipher: req.name.clone(),
                name_hashed: req.name_hashed.clone(),
                parent: req.parent.clone(),
                timestamp: req.creation_time.unwrap_or_else(Self::now_ms),
            },
        );
        Ok(())
    }

    async fn item_move(&self, kind: ItemKind, uuid: &str, to: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match kind {
            ItemKind::Folder => {
                let rec = state.folders.get_mut(uuid).ok_or_else(|| not_found("folder"))?;
                rec.parent = to.to_string();
            }
            ItemKind::File => {
                let rec = state.files.get_mut(uuid).ok_or_else(|| not_found("file"))?;
                rec.parent = to.to_string();
            }
        }
        Ok(())
    }

    async fn dir_rename(&self, req: &DirRenameRequest) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let rec = state
            .folders
            .get_mut(&req.uuid)
            .ok_or_else(|| not_found("folder"))?;
        rec.name_cipher = req.name.clone();
        rec.name_hashed = req.name_hashed.clone();
        Ok(())
    }

    async fn file_rename(&self, req: &FileRenameRequest) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let rec = state
            .files
            .get_mut(&req.uuid)
            .ok_or_else(|| not_found("file"))?;
        rec.metadata_cipher = req.metadata.clone();
        rec.name_hashed = req.name_hashed.clone();
        Ok(())
    }

    async fn item_trash(&self, kind: ItemKind, uuid: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let known = match kind {
            ItemKind::Folder => state.folders.contains_key(uuid),
            ItemKind::File => state.files.contains_key(uuid),
        };
        if !known {
            return Err(not_found("item"));
        }
        state.trashed.insert(uuid.to_string());
        Ok(())
    }

    async fn item_restore(&self, _kind: ItemKind, uuid: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.trashed.remove(uuid) {
            return Err(not_found("trashed item"));
        }
        Ok(())
    }

    async fn item_delete_permanent(&self, kind: ItemKind, uuid: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.trashed.remove(uuid);
        match kind {
            ItemKind::Folder => {
                state.folders.remove(uuid).ok_or_else(|| not_found("folder"))?;
            }
            ItemKind::File => {
                state.files.remove(uuid).ok_or_else(|| not_found("file"))?;
                state.chunks.retain(|(file, _), _| file != uuid);
            }
        }
        Ok(())
    }

    async fn upload_chunk(&self, params: &ChunkUploadParams, body: Vec<u8>) -> Result<()> {
        if let Some(fail_at) = *self.fail_chunks_at.lock().unwrap() {
            if params.index >= fail_at {
                return Err(FilenError::Network(format!(
                    "injected failure at chunk {}",
                    params.index
                )));
            }
        }
        // The real ingest endpoint verifies the declared ciphertext hash.
        let digest = hex::encode(Sha512::digest(&body));
        if digest != params.hash {
            return Err(FilenError::Api {
                message: "chunk hash mismatch".to_string(),
                code: Some("invalid_hash".to_string()),
            });
        }

        let mut state = self.state.lock().unwrap();
        let staged = state
            .staged
            .entry(params.upload_key.clone())
            .or_insert_with(|| StagedUpload {
                file_uuid: params.file_uuid.clone(),
                parent: params.parent.clone(),
                chunks: HashMap::new(),
            });
        staged.chunks.insert(params.index, body);
        Ok(())
    }

    async fn upload_empty(&self, req: &EmptyUploadRequest) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.files.insert(
            req.uuid.clone(),
            FileRec {
                uuid: req.uuid.clone(),
                metadata_cipher: req.metadata.clone(),
                name_hashed: req.name_hashed.clone(),
                parent: req.parent.clone(),
                chunks: 0,
                timestamp: Self::now_ms(),
            },
        );
        Ok(())
    }

    async fn upload_done(&self, req: &UploadDoneRequest) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let staged = state.staged.remove(&req.upload_key).ok_or(FilenError::Api {
            message: "unknown upload key".to_string(),
            code: Some("invalid_upload_key".to_string()),
        })?;

        if staged.chunks.len() as u32 != req.chunks
            || (0..req.chunks).any(|i| !staged.chunks.contains_key(&i))
        {
            return Err(FilenError::Api {
                message: format!(
                    "upload incomplete: expected {} chunks, have {}",
                    req.chunks,
                    staged.chunks.len()
                ),
                code: Some("missing_chunks".to_string()),
            });
        }

        for (index, body) in staged.chunks {
            state.chunks.insert((staged.file_uuid.clone(), index), body);
        }
        state.files.insert(
            req.uuid.clone(),
            FileRec {
                uuid: req.uuid.clone(),
                metadata_cipher: req.metadata.clone(),
                name_hashed: req.name_hashed.clone(),
                parent: staged.parent,
                chunks: req.chunks,
                timestamp: Self::now_ms(),
            },
        );
        Ok(())
    }

    async fn download_chunk(
        &self,
        _region: &str,
        _bucket: &str,
        file_uuid: &str,
        index: u32,
    ) -> Result<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state
            .chunks
            .get(&(file_uuid.to_string(), index))
            .cloned()
            .ok_or_else(|| not_found("chunk"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_params(upload_key: &str, index: u32, body: &[u8]) -> ChunkUploadParams {
        ChunkUploadParams {
            file_uuid: "file-1".into(),
            index,
            parent: "root".into(),
            upload_key: upload_key.into(),
            hash: hex::encode(Sha512::digest(body)),
        }
    }

    fn done_request(upload_key: &str, chunks: u32) -> UploadDoneRequest {
        UploadDoneRequest {
            uuid: "file-1".into(),
            name: "cipher".into(),
            name_hashed: "hashed".into(),
            size: "cipher".into(),
            chunks,
            mime: "cipher".into(),
            rm: "rm".into(),
            metadata: "cipher".into(),
            version: 2,
            upload_key: upload_key.into(),
        }
    }

    #[tokio::test]
    async fn staged_chunks_commit_on_done() {
        let mem = MemoryTransport::new();
        mem.upload_chunk(&chunk_params("key", 0, b"aaa"), b"aaa".to_vec())
            .await
            .unwrap();
        mem.upload_chunk(&chunk_params("key", 1, b"bbb"), b"bbb".to_vec())
            .await
            .unwrap();
        assert_eq!(mem.committed_chunks("file-1"), 0);

        mem.upload_done(&done_request("key", 2)).await.unwrap();
        assert_eq!(mem.committed_chunks("file-1"), 2);
        assert!(!mem.has_staged("key"));
        assert_eq!(
            mem.download_chunk("r", "b", "file-1", 1).await.unwrap(),
            b"bbb"
        );
    }

    #[tokio::test]
    async fn done_with_missing_chunks_fails() {
        let mem = MemoryTransport::new();
        mem.upload_chunk(&chunk_params("key", 0, b"aaa"), b"aaa".to_vec())
            .await
            .unwrap();
        let err = mem.upload_done(&done_request("key", 2)).await.unwrap_err();
        assert!(matches!(err, FilenError::Api { .. }));
    }

    #[tokio::test]
    async fn hash_mismatch_rejected() {
        let mem = MemoryTransport::new();
        let mut params = chunk_params("key", 0, b"aaa");
        params.hash = "00".repeat(64);
        let err = mem.upload_chunk(&params, b"aaa".to_vec()).await.unwrap_err();
        assert!(matches!(err, FilenError::Api { .. }));
    }

    #[tokio::test]
    async fn duplicate_dir_create_is_409() {
        let mem = MemoryTransport::new();
        let req = DirCreateRequest {
            uuid: "f1".into(),
            name: "cipher".into(),
            name_hashed: "same".into(),
            parent: "root".into(),
            creation_time: None,
            modification_time: None,
        };
        mem.dir_create(&req).await.unwrap();
        let mut dup = req.clone();
        dup.uuid = "f2".into();
        let err = mem.dir_create(&dup).await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn trash_and_restore_cycle() {
        let mem = MemoryTransport::new();
        mem.dir_create(&DirCreateRequest {
            uuid: "f1".into(),
            name: "cipher".into(),
            name_hashed: "h".into(),
            parent: "root".into(),
            creation_time: None,
            modification_time: None,
        })
        .await
        .unwrap();

        mem.item_trash(ItemKind::Folder, "f1").await.unwrap();
        assert!(mem.dir_content("root").await.unwrap().folders.is_empty());
        assert_eq!(mem.dir_content(TRASH_UUID).await.unwrap().folders.len(), 1);

        mem.item_restore(ItemKind::Folder, "f1").await.unwrap();
        assert_eq!(mem.dir_content("root").await.unwrap().folders.len(), 1);
    }

    #[tokio::test]
    async fn injected_chunk_failure() {
        let mem = MemoryTransport::new();
        mem.fail_chunk_uploads_at(Some(1));
        mem.upload_chunk(&chunk_params("key", 0, b"ok"), b"ok".to_vec())
            .await
            .unwrap();
        let err = mem
            .upload_chunk(&chunk_params("key", 1, b"no"), b"no".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, FilenError::Network(_)));
    }
}
