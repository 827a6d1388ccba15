//! Generation flow: the analyze call plus the current-record slot.
//!
//! At most one generation is in flight at a time. A second request while
//! one is running is rejected immediately, never queued: the backend call
//! is slow and expensive, and queuing would let an impatient double-click
//! burn two runs on identical input. The guard is an atomic flag released
//! on every exit path, so a failed run frees the flow for a retry.
//!
//! A successful run installs its record as the current record and
//! re-fetches the history cache wholesale; a failure there is logged and
//! swallowed because the generated record is already in hand. A failed run
//! leaves the current record untouched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::api::{ApiError, MatcherApi};
use crate::errors::ClientError;
use crate::history::HistoryStore;
use crate::models::{AnalyzeRequest, GenerationRecord};

const MSG_IN_FLIGHT: &str = "Generation already in progress";
const MSG_UPLOAD_CV_FIRST: &str = "Please upload your CV first in the Upload CV tab";
const MSG_UPLOAD_JOB_FIRST: &str = "Please upload a job listing first in the Job Listing tab";

/// Raw generation inputs as the user typed them. Empty profile fields mean
/// "not provided" and are dropped from the request body entirely.
#[derive(Debug, Clone, Default)]
pub struct GenerationParams {
    pub github_username: String,
    pub linkedin_url: String,
    pub use_sample_data: bool,
}

impl GenerationParams {
    fn to_request(&self) -> AnalyzeRequest {
        AnalyzeRequest {
            github_username: some_if_nonempty(&self.github_username),
            linkedin_url: some_if_nonempty(&self.linkedin_url),
            use_sample_data: self.use_sample_data,
        }
    }
}

fn some_if_nonempty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

pub struct GenerationFlow {
    api: Arc<dyn MatcherApi>,
    history: Arc<HistoryStore>,
    in_flight: AtomicBool,
    current: Mutex<Option<GenerationRecord>>,
}

/// Clears the in-flight flag when dropped, covering early returns.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl GenerationFlow {
    pub fn new(api: Arc<dyn MatcherApi>, history: Arc<HistoryStore>) -> Self {
        Self {
            api,
            history,
            in_flight: AtomicBool::new(false),
            current: Mutex::new(None),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// The record currently on display, if any.
    pub async fn current(&self) -> Option<GenerationRecord> {
        self.current.lock().await.clone()
    }

    /// Installs a record loaded from history as the current record.
    pub async fn set_current(&self, record: GenerationRecord) {
        *self.current.lock().await = Some(record);
    }

    /// Runs one generation. Rejects immediately if another run holds the
    /// guard; otherwise calls the backend, installs the record, refreshes
    /// history, and returns the generated record.
    pub async fn generate(&self, params: &GenerationParams) -> Result<GenerationRecord, ClientError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("generation rejected, another run is in flight");
            return Err(ClientError::Input(MSG_IN_FLIGHT.to_string()));
        }
        let _guard = FlightGuard(&self.in_flight);

        let response = self
            .api
            .analyze(&params.to_request())
            .await
            .map_err(map_analyze_error)?;

        info!(
            history_id = response.history_id.as_deref().unwrap_or("-"),
            resume_bytes = response.data.tailored_resume.len(),
            "generation complete"
        );

        *self.current.lock().await = Some(response.data.clone());

        if let Err(err) = self.history.refresh().await {
            warn!(error = %err, "history refresh after generation failed");
        }

        Ok(response.data)
    }
}

/// Precondition failures from the backend ("No CV found", "No job listing
/// found") become guidance pointing at the upload tab that is still empty.
/// Everything else keeps its transport classification.
fn map_analyze_error(err: ApiError) -> ClientError {
    if let ApiError::Api { message, .. } = &err {
        if message.contains("No CV found") {
            return ClientError::Input(MSG_UPLOAD_CV_FIRST.to_string());
        }
        if message.contains("No job listing found") {
            return ClientError::Input(MSG_UPLOAD_JOB_FIRST.to_string());
        }
    }
    err.into()
}
