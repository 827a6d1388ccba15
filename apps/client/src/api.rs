//! Backend API client: the single point of entry for all backend calls.
//!
//! ARCHITECTURAL RULE: No other module may construct an HTTP request.
//! Every network interaction goes through the `MatcherApi` trait, so tests
//! substitute in-memory fakes and the rest of the client never sees reqwest.
//!
//! There is deliberately no automatic retry here: network and server errors
//! are dismissible and retried manually by the user, and transparent retry
//! would hide duplicate requests from the single-flight generation guard.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::debug;

use crate::models::{
    AnalyzeRequest, AnalyzeResponse, HistoryResponse, RawHistoryEntry, UploadReceipt,
};
use crate::upload::{UploadKind, UploadPayload};

const JOB_LISTING_PATH: &str = "/api/job-listing";
const CV_PATH: &str = "/api/cv";
const ANALYZE_PATH: &str = "/api/analyze";
const HISTORY_PATH: &str = "/api/cv-history";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Backend error payload: `{"error": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait seam
// ────────────────────────────────────────────────────────────────────────────

/// The backend surface the client depends on. Held as `Arc<dyn MatcherApi>`
/// on the session so tests can inject counting or failing fakes.
#[async_trait]
pub trait MatcherApi: Send + Sync {
    /// Uploads one document (text and/or file) to the slot-specific endpoint.
    async fn upload_document(
        &self,
        kind: UploadKind,
        payload: &UploadPayload,
    ) -> Result<UploadReceipt, ApiError>;

    /// Requests a generation run against the currently uploaded documents.
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, ApiError>;

    /// Fetches the newest `limit` history entries, in whatever order the
    /// backend chooses to answer.
    async fn fetch_history(&self, limit: u32) -> Result<Vec<RawHistoryEntry>, ApiError>;
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP implementation
// ────────────────────────────────────────────────────────────────────────────

/// Production `MatcherApi` backed by a shared reqwest client.
#[derive(Clone)]
pub struct HttpMatcherApi {
    client: Client,
    base_url: String,
}

impl HttpMatcherApi {
    pub fn new(base_url: String, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl MatcherApi for HttpMatcherApi {
    async fn upload_document(
        &self,
        kind: UploadKind,
        payload: &UploadPayload,
    ) -> Result<UploadReceipt, ApiError> {
        let form = match payload {
            UploadPayload::Text(text) => Form::new().text("text", text.clone()),
            UploadPayload::File(file) => {
                let part = Part::bytes(file.bytes.to_vec())
                    .file_name(file.filename.clone())
                    .mime_str(&file.content_type)?;
                Form::new().part("file", part)
            }
        };

        let path = match kind {
            UploadKind::JobListing => JOB_LISTING_PATH,
            UploadKind::Cv => CV_PATH,
        };
        debug!(endpoint = path, "uploading document");

        let response = self.client.post(self.url(path)).multipart(form).send().await?;
        decode_response(response).await
    }

    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, ApiError> {
        debug!(
            endpoint = ANALYZE_PATH,
            use_sample_data = request.use_sample_data,
            "requesting generation"
        );
        let response = self
            .client
            .post(self.url(ANALYZE_PATH))
            .json(request)
            .send()
            .await?;
        decode_response(response).await
    }

    async fn fetch_history(&self, limit: u32) -> Result<Vec<RawHistoryEntry>, ApiError> {
        let response = self
            .client
            .get(self.url(HISTORY_PATH))
            .query(&[("limit", limit)])
            .send()
            .await?;
        let parsed: HistoryResponse = decode_response(response).await?;
        Ok(parsed.history)
    }
}

/// Decodes a JSON success body, or maps a non-2xx response to
/// `ApiError::Api` using the backend's `{"error"}` envelope with a
/// raw-text fallback.
async fn decode_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        return Err(ApiError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(ApiError::Parse)
}
