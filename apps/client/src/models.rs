//! Wire and domain models shared across the client.
//!
//! Wire types deserialize tolerantly: every field defaults when missing so
//! a partial or older record degrades to empty strings instead of failing
//! the whole response. Unknown record fields ride along in `extra` and are
//! preserved on re-serialization.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

// ────────────────────────────────────────────────────────────────────────────
// Generation record
// ────────────────────────────────────────────────────────────────────────────

/// One generated result from the analyze endpoint.
///
/// `tailored_resume` is the document the formatter and both exporters
/// consume; `analysis` and `recommendations` are additional plain-text
/// sections rendered with the same formatter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    #[serde(default)]
    pub analysis: String,
    #[serde(default)]
    pub tailored_resume: String,
    #[serde(default)]
    pub recommendations: String,
    /// Server-side creation time (ISO-8601), when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Unknown fields pass through untouched (status flags, content hashes).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ────────────────────────────────────────────────────────────────────────────
// History
// ────────────────────────────────────────────────────────────────────────────

/// History element exactly as the backend ships it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawHistoryEntry {
    pub id: String,
    #[serde(default)]
    pub timestamp: RawTimestamp,
    #[serde(default)]
    pub data: GenerationRecord,
}

/// History timestamps on the wire: epoch milliseconds or an ISO-8601
/// string, depending on backend version. Both sort the same once
/// normalized through `as_millis`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Millis(i64),
    Iso(String),
}

impl Default for RawTimestamp {
    fn default() -> Self {
        RawTimestamp::Millis(0)
    }
}

impl RawTimestamp {
    pub fn as_millis(&self) -> i64 {
        match self {
            RawTimestamp::Millis(ms) => *ms,
            RawTimestamp::Iso(raw) => parse_timestamp_ms(raw),
        }
    }
}

/// Client-side history element with a sortable timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    /// Epoch milliseconds derived from the backend's ISO-8601 timestamp.
    pub timestamp_ms: i64,
    pub record: GenerationRecord,
}

impl RawHistoryEntry {
    pub fn into_entry(self) -> HistoryEntry {
        HistoryEntry {
            timestamp_ms: self.timestamp.as_millis(),
            id: self.id,
            record: self.data,
        }
    }
}

/// Parses an ISO-8601 timestamp into epoch milliseconds.
///
/// The backend emits naive local-less timestamps (`2026-08-23T14:31:07.123456`);
/// those are read as UTC. Offset-carrying timestamps are honored. An
/// unparseable value degrades to 0 with a warning; the entry still renders,
/// it just sorts last.
pub fn parse_timestamp_ms(raw: &str) -> i64 {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.timestamp_millis();
    }
    if let Ok(naive) = raw.parse::<NaiveDateTime>() {
        return naive.and_utc().timestamp_millis();
    }
    warn!(timestamp = raw, "unparseable history timestamp, sorting it last");
    0
}

// ────────────────────────────────────────────────────────────────────────────
// Request / response envelopes
// ────────────────────────────────────────────────────────────────────────────

/// Body for the analyze endpoint. `None` fields are omitted entirely;
/// the backend distinguishes "absent" from "empty".
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    pub use_sample_data: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeResponse {
    pub data: GenerationRecord,
    #[serde(default)]
    pub history_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub history: Vec<RawHistoryEntry>,
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
