//! The transport seam and its production HTTP implementation.
//!
//! Retry policy lives here and nowhere else: network-level failures and
//! HTTP 5xx are retried with 1 s / 2 s / 4 s delays; 4xx surfaces
//! immediately (401 as an auth failure). Chunk uploads are not retried,
//! since the resumable upload engine owns that failure mode, but they do
//! get a hard 30-second timeout per chunk.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use filen_core::config::ApiConfig;
use filen_core::{FilenError, ItemKind, Result, TwoFactorChallenge};

use crate::api::{
    ApiResponse, ChunkUploadParams, DirContent, DirCreateRequest, DirRenameRequest,
    EmptyUploadRequest, FileExistsData, FileRenameRequest, RawFileInfo, UploadDoneRequest,
};

/// Backoff schedule for transient failures.
const RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// Everything the engine needs from the service, behind one object-safe
/// trait so tests can swap in [`crate::MemoryTransport`].
#[async_trait]
pub trait DriveTransport: Send + Sync {
    /// `POST /v3/dir/content`. `uuid: "trash"` lists the trash.
    async fn dir_content(&self, uuid: &str) -> Result<DirContent>;

    /// `POST /v3/file`: single record lookup.
    async fn file_info(&self, uuid: &str) -> Result<RawFileInfo>;

    /// `POST /v3/file/exists`: server-side name probe.
    async fn file_exists(&self, parent: &str, name_hashed: &str) -> Result<bool>;

    async fn dir_create(&self, req: &DirCreateRequest) -> Result<()>;

    async fn item_move(&self, kind: ItemKind, uuid: &str, to: &str) -> Result<()>;

    async fn dir_rename(&self, req: &DirRenameRequest) -> Result<()>;

    async fn file_rename(&self, req: &FileRenameRequest) -> Result<()>;

    async fn item_trash(&self, kind: ItemKind, uuid: &str) -> Result<()>;

    /// Restore puts the item back under its original parent; there is no
    /// target parameter.
    async fn item_restore(&self, kind: ItemKind, uuid: &str) -> Result<()>;

    async fn item_delete_permanent(&self, kind: ItemKind, uuid: &str) -> Result<()>;

    /// POST one ciphertext chunk to the ingest endpoint. Not retried; a
    /// timeout or non-success becomes the caller's resume point.
    async fn upload_chunk(&self, params: &ChunkUploadParams, body: Vec<u8>) -> Result<()>;

    async fn upload_empty(&self, req: &EmptyUploadRequest) -> Result<()>;

    async fn upload_done(&self, req: &UploadDoneRequest) -> Result<()>;

    /// GET one ciphertext chunk from the egest endpoint (unauthenticated).
    async fn download_chunk(
        &self,
        region: &str,
        bucket: &str,
        file_uuid: &str,
        index: u32,
    ) -> Result<Vec<u8>>;
}

fn kind_segment(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Folder => "dir",
        ItemKind::File => "file",
    }
}

/// Whether an error is worth another attempt under the backoff schedule.
fn is_retryable(err: &FilenError) -> bool {
    match err {
        FilenError::Network(_) => true,
        FilenError::HttpStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

pub struct HttpTransport {
    http: reqwest::Client,
    gateway: String,
    ingest: String,
    egest: String,
    api_key: Option<String>,
    max_retries: u32,
    chunk_timeout: Duration,
}

impl HttpTransport {
    pub fn new(api: &ApiConfig, api_key: Option<String>, chunk_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| anyhow::anyhow!("building HTTP client: {e}"))?;
        Ok(Self {
            http,
            gateway: api.gateway.trim_end_matches('/').to_string(),
            ingest: api.ingest.trim_end_matches('/').to_string(),
            egest: api.egest.trim_end_matches('/').to_string(),
            api_key,
            max_retries: api.max_retries,
            chunk_timeout,
        })
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// One attempt of an API call: send, map transport/HTTP failures, parse
    /// the response envelope, map domain failures.
    async fn attempt_api(&self, builder: reqwest::RequestBuilder) -> Result<Option<serde_json::Value>> {
        let resp = builder
            .send()
            .await
            .map_err(|e| FilenError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            if status.as_u16() == 401 {
                return Err(FilenError::AuthFailed(
                    "API key rejected (HTTP 401)".to_string(),
                ));
            }
            return Err(FilenError::HttpStatus {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ApiResponse<serde_json::Value> = resp
            .json()
            .await
            .map_err(|e| FilenError::Network(format!("reading response body: {e}")))?;

        if !envelope.status {
            return Err(match envelope.code.as_deref() {
                Some("enter_2fa") => FilenError::AuthChallenge(TwoFactorChallenge::Required),
                Some("wrong_2fa") => FilenError::AuthChallenge(TwoFactorChallenge::Wrong),
                _ => FilenError::Api {
                    message: envelope
                        .message
                        .unwrap_or_else(|| "unspecified API error".to_string()),
                    code: envelope.code,
                },
            });
        }
        Ok(envelope.data)
    }

    /// POST with the retry schedule applied to transient failures.
    async fn post_api<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<serde_json::Value>> {
        let url = format!("{}{}", self.gateway, path);
        let mut attempt = 0usize;
        loop {
            let builder = self.authorize(self.http.post(&url)).json(body);
            match self.attempt_api(builder).await {
                Ok(data) => return Ok(data),
                Err(err) if is_retryable(&err) && attempt < self.max_retries as usize => {
                    let delay = RETRY_DELAYS[attempt.min(RETRY_DELAYS.len() - 1)];
                    warn!(%url, attempt, ?delay, "transient API failure, retrying: {err}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub(crate) async fn post_data<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let data = self
            .post_api(path, body)
            .await?
            .ok_or_else(|| anyhow::anyhow!("{path}: response carried no data"))?;
        serde_json::from_value(data)
            .map_err(|e| anyhow::anyhow!("{path}: unexpected response shape: {e}").into())
    }

    async fn post_ok<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        self.post_api(path, body).await.map(|_| ())
    }

    /// GET with the same retry schedule (used by `/v3/user/baseFolder`).
    pub(crate) async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.gateway, path);
        let mut attempt = 0usize;
        loop {
            let builder = self.authorize(self.http.get(&url));
            match self.attempt_api(builder).await {
                Ok(Some(data)) => {
                    return serde_json::from_value(data).map_err(|e| {
                        anyhow::anyhow!("{path}: unexpected response shape: {e}").into()
                    })
                }
                Ok(None) => {
                    return Err(anyhow::anyhow!("{path}: response carried no data").into())
                }
                Err(err) if is_retryable(&err) && attempt < self.max_retries as usize => {
                    let delay = RETRY_DELAYS[attempt.min(RETRY_DELAYS.len() - 1)];
                    warn!(%url, attempt, ?delay, "transient API failure, retrying: {err}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

}

#[async_trait]
impl DriveTransport for HttpTransport {
    async fn dir_content(&self, uuid: &str) -> Result<DirContent> {
        debug!(uuid, "dir/content");
        self.post_data("/v3/dir/content", &serde_json::json!({ "uuid": uuid }))
            .await
    }

    async fn file_info(&self, uuid: &str) -> Result<RawFileInfo> {
        self.post_data("/v3/file", &serde_json::json!({ "uuid": uuid }))
            .await
    }

    async fn file_exists(&self, parent: &str, name_hashed: &str) -> Result<bool> {
        let data: FileExistsData = self
            .post_data(
                "/v3/file/exists",
                &serde_json::json!({ "parent": parent, "nameHashed": name_hashed }),
            )
            .await?;
        Ok(data.exists)
    }

    async fn dir_create(&self, req: &DirCreateRequest) -> Result<()> {
        self.post_ok("/v3/dir/create", req).await
    }

    async fn item_move(&self, kind: ItemKind, uuid: &str, to: &str) -> Result<()> {
        let path = format!("/v3/{}/move", kind_segment(kind));
        self.post_ok(&path, &serde_json::json!({ "uuid": uuid, "to": to }))
            .await
    }

    async fn dir_rename(&self, req: &DirRenameRequest) -> Result<()> {
        self.post_ok("/v3/dir/rename", req).await
    }

    async fn file_rename(&self, req: &FileRenameRequest) -> Result<()> {
        self.post_ok("/v3/file/rename", req).await
    }

    async fn item_trash(&self, kind: ItemKind, uuid: &str) -> Result<()> {
        let path = format!("/v3/{}/trash", kind_segment(kind));
        self.post_ok(&path, &serde_json::json!({ "uuid": uuid })).await
    }

    async fn item_restore(&self, kind: ItemKind, uuid: &str) -> Result<()> {
        let path = format!("/v3/{}/restore", kind_segment(kind));
        self.post_ok(&path, &serde_json::json!({ "uuid": uuid })).await
    }

    async fn item_delete_permanent(&self, kind: ItemKind, uuid: &str) -> Result<()> {
        let path = format!("/v3/{}/delete/permanent", kind_segment(kind));
        self.post_ok(&path, &serde_json::json!({ "uuid": uuid })).await
    }

    async fn upload_chunk(&self, params: &ChunkUploadParams, body: Vec<u8>) -> Result<()> {
        let url = format!(
            "{}/v3/upload?uuid={}&index={}&parent={}&uploadKey={}&hash={}",
            self.ingest, params.file_uuid, params.index, params.parent, params.upload_key,
            params.hash,
        );
        let builder = self
            .authorize(self.http.post(&url))
            .timeout(self.chunk_timeout)
            .body(body);
        // A single shot: the upload engine turns any failure here into a
        // resume point instead of blindly re-sending.
        self.attempt_api(builder).await.map(|_| ())
    }

    async fn upload_empty(&self, req: &EmptyUploadRequest) -> Result<()> {
        self.post_ok("/v3/upload/empty", req).await
    }

    async fn upload_done(&self, req: &UploadDoneRequest) -> Result<()> {
        self.post_ok("/v3/upload/done", req).await
    }

    async fn download_chunk(
        &self,
        region: &str,
        bucket: &str,
        file_uuid: &str,
        index: u32,
    ) -> Result<Vec<u8>> {
        let url = format!("{}/{region}/{bucket}/{file_uuid}/{index}", self.egest);
        let mut attempt = 0usize;
        loop {
            let result = async {
                let resp = self
                    .http
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| FilenError::Network(e.to_string()))?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(FilenError::HttpStatus {
                        status: status.as_u16(),
                        message: format!("chunk {index} fetch failed"),
                    });
                }
                resp.bytes()
                    .await
                    .map(|b| b.to_vec())
                    .map_err(|e| FilenError::Network(e.to_string()))
            }
            .await;

            match result {
                Ok(bytes) => return Ok(bytes),
                Err(err) if is_retryable(&err) && attempt < self.max_retries as usize => {
                    let delay = RETRY_DELAYS[attempt.min(RETRY_DELAYS.len() - 1)];
                    warn!(%url, attempt, ?delay, "chunk fetch failed, retrying: {err}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_schedule_is_one_two_four() {
        assert_eq!(
            RETRY_DELAYS,
            [
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
    }

    #[test]
    fn retryable_classification() {
        assert!(is_retryable(&FilenError::Network("reset".into())));
        assert!(is_retryable(&FilenError::HttpStatus {
            status: 503,
            message: String::new()
        }));
        assert!(!is_retryable(&FilenError::HttpStatus {
            status: 404,
            message: String::new()
        }));
        assert!(!is_retryable(&FilenError::AuthFailed("401".into())));
        assert!(!is_retryable(&FilenError::Api {
            message: "nope".into(),
            code: None
        }));
    }

    #[test]
    fn kind_segments() {
        assert_eq!(kind_segment(ItemKind::Folder), "dir");
        assert_eq!(kind_segment(ItemKind::File), "file");
    }
}
