//! Wire request/response types for the JSON API.
//!
//! Raw records carry ciphertext (`name`, `metadata` are "002" envelopes);
//! decryption happens a layer up in filen-drive. Field names follow the
//! server's camelCase exactly.

use serde::{Deserialize, Serialize};

/// The uniform response envelope: `status: false` is a domain error whose
/// `message`/`code` the transport maps to typed errors.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub status: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

// ── Auth ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AuthInfo {
    #[serde(rename = "authVersion")]
    pub auth_version: u32,
    pub salt: String,
}

/// `masterKeys` in the login response is either one envelope over the
/// pipe-joined key list or a list of envelopes, depending on account age.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MasterKeysField {
    Single(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    #[serde(rename = "apiKey")]
    pub api_key: String,
    #[serde(rename = "masterKeys")]
    pub master_keys: MasterKeysField,
    #[serde(rename = "baseFolderUUID", default)]
    pub base_folder_uuid: Option<String>,
    #[serde(default)]
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BaseFolder {
    pub uuid: String,
}

// ── Listings ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFolderRecord {
    pub uuid: String,
    /// Folder name envelope.
    pub name: String,
    pub parent: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(rename = "lastModified", default)]
    pub last_modified: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFileRecord {
    pub uuid: String,
    /// File metadata envelope (JSON of name/size/mime/key/hash/lastModified).
    pub metadata: String,
    pub parent: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub chunks: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirContent {
    #[serde(default)]
    pub folders: Vec<RawFolderRecord>,
    #[serde(default)]
    pub uploads: Vec<RawFileRecord>,
}

/// `POST /v3/file`: single file record lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFileInfo {
    pub metadata: String,
    #[serde(default)]
    pub chunks: u32,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub bucket: String,
    pub parent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileExistsData {
    pub exists: bool,
}

// ── Mutations ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirCreateRequest {
    pub uuid: String,
    /// Folder name envelope (JSON `{name}` form).
    pub name: String,
    pub name_hashed: String,
    pub parent: String,
    /// Only the final component of a `mkdir -p` carries timestamps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modification_time: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirRenameRequest {
    pub uuid: String,
    pub name: String,
    pub name_hashed: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRenameRequest {
    pub uuid: String,
    /// New name sealed under the per-file key.
    pub name: String,
    pub name_hashed: String,
    /// Full metadata envelope re-sealed under the newest master key.
    pub metadata: String,
}

// ── Uploads ──────────────────────────────────────────────────────────────────

/// URL-query envelope for one chunk POST to the ingest endpoint.
#[derive(Debug, Clone)]
pub struct ChunkUploadParams {
    pub file_uuid: String,
    pub index: u32,
    pub parent: String,
    pub upload_key: String,
    /// Lowercase hex SHA-512 of the ciphertext body (IV included).
    pub hash: String,
}

/// `POST /v3/upload/empty`: zero-byte files never touch the ingest path.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyUploadRequest {
    pub uuid: String,
    pub name: String,
    pub name_hashed: String,
    /// Size envelope (the string "0" sealed under the file key).
    pub size: String,
    pub parent: String,
    pub mime: String,
    pub metadata: String,
    pub version: u32,
}

/// `POST /v3/upload/done`: finalize a chunked upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDoneRequest {
    pub uuid: String,
    pub name: String,
    pub name_hashed: String,
    pub size: String,
    pub chunks: u32,
    pub mime: String,
    pub rm: String,
    pub metadata: String,
    pub version: u32,
    pub upload_key: String,
}
