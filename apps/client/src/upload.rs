//! Upload slots for the two source documents.
//!
//! The coordinator owns one slot per document kind (job listing and CV),
//! validates payloads before any network traffic, tracks each slot through
//! Pending → Success/Error, and arms the one-shot Upload → Match transition
//! the moment both slots report success. Slots are independent: a failure
//! in one never touches the other, and re-submitting a slot simply runs it
//! through the same lifecycle again.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::api::MatcherApi;
use crate::errors::ClientError;
use crate::models::UploadReceipt;
use crate::stage::StageController;

const MSG_MISSING_INPUT: &str = "Please provide either text or upload a file";
const MSG_BAD_FORMAT: &str = "Please upload a PDF or Word document";

/// MIME types the backend extracts text from.
pub const ALLOWED_MIME_TYPES: [&str; 3] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Maps a file extension to its upload MIME type. `None` means the format
/// is not accepted and the payload must be rejected client-side.
pub fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "pdf" => Some("application/pdf"),
        "doc" => Some("application/msword"),
        "docx" => {
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
        }
        _ => None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Payloads
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    JobListing,
    Cv,
}

impl std::fmt::Display for UploadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            UploadKind::JobListing => "Job Listing",
            UploadKind::Cv => "CV",
        })
    }
}

#[derive(Debug, Clone)]
pub struct FilePayload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Input for one slot: pasted text or a picked file, never both.
/// Validation happens in `submit`, not at construction, so the UI can hand
/// over whatever the user typed.
#[derive(Debug, Clone)]
pub enum UploadPayload {
    Text(String),
    File(FilePayload),
}

impl UploadPayload {
    pub fn from_file(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Bytes,
    ) -> Self {
        UploadPayload::File(FilePayload {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        })
    }

    /// Rejects empty payloads and disallowed file formats before any
    /// request is made. Whitespace-only text counts as missing.
    fn validate(&self) -> Result<(), ClientError> {
        match self {
            UploadPayload::Text(text) if text.trim().is_empty() => {
                Err(ClientError::Input(MSG_MISSING_INPUT.to_string()))
            }
            UploadPayload::Text(_) => Ok(()),
            UploadPayload::File(file)
                if !ALLOWED_MIME_TYPES.contains(&file.content_type.as_str()) =>
            {
                Err(ClientError::Input(MSG_BAD_FORMAT.to_string()))
            }
            UploadPayload::File(_) => Ok(()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Slot state
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SlotState {
    #[default]
    Idle,
    Pending,
    Success {
        message: String,
    },
    Error {
        message: String,
    },
}

impl SlotState {
    pub fn is_success(&self) -> bool {
        matches!(self, SlotState::Success { .. })
    }
}

#[derive(Default)]
struct Slots {
    job: SlotState,
    cv: SlotState,
}

impl Slots {
    fn get(&self, kind: UploadKind) -> &SlotState {
        match kind {
            UploadKind::JobListing => &self.job,
            UploadKind::Cv => &self.cv,
        }
    }

    fn set(&mut self, kind: UploadKind, state: SlotState) {
        match kind {
            UploadKind::JobListing => self.job = state,
            UploadKind::Cv => self.cv = state,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Coordinator
// ────────────────────────────────────────────────────────────────────────────

pub struct UploadCoordinator {
    api: Arc<dyn MatcherApi>,
    stages: Arc<StageController>,
    slots: Mutex<Slots>,
}

impl UploadCoordinator {
    pub fn new(api: Arc<dyn MatcherApi>, stages: Arc<StageController>) -> Self {
        Self {
            api,
            stages,
            slots: Mutex::new(Slots::default()),
        }
    }

    pub async fn slot_state(&self, kind: UploadKind) -> SlotState {
        self.slots.lock().await.get(kind).clone()
    }

    pub async fn both_succeeded(&self) -> bool {
        let slots = self.slots.lock().await;
        slots.job.is_success() && slots.cv.is_success()
    }

    /// Runs one slot through its upload lifecycle. The slot lock is never
    /// held across the network call, so the other slot stays responsive.
    pub async fn submit(
        &self,
        kind: UploadKind,
        payload: UploadPayload,
    ) -> Result<UploadReceipt, ClientError> {
        if let Err(err) = payload.validate() {
            let message = err.user_message();
            self.slots.lock().await.set(kind, SlotState::Error { message });
            return Err(err);
        }

        self.slots.lock().await.set(kind, SlotState::Pending);

        match self.api.upload_document(kind, &payload).await {
            Ok(receipt) => {
                let message = if receipt.message.is_empty() {
                    "Upload successful".to_string()
                } else {
                    receipt.message.clone()
                };
                info!(kind = %kind, message = %message, "upload succeeded");
                self.slots.lock().await.set(kind, SlotState::Success { message });

                if self.both_succeeded().await {
                    self.stages.schedule_match_transition();
                }
                Ok(receipt)
            }
            Err(api_err) => {
                let err = ClientError::from(api_err);
                warn!(kind = %kind, error = %err, "upload failed");
                self.slots
                    .lock()
                    .await
                    .set(kind, SlotState::Error { message: err.user_message() });
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::models::{AnalyzeRequest, AnalyzeResponse, RawHistoryEntry};
    use crate::stage::Stage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeApi {
        upload_calls: AtomicUsize,
        fail_status: Option<u16>,
    }

    impl FakeApi {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                upload_calls: AtomicUsize::new(0),
                fail_status: None,
            })
        }

        fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self {
                upload_calls: AtomicUsize::new(0),
                fail_status: Some(status),
            })
        }
    }

    #[async_trait]
    impl MatcherApi for FakeApi {
        async fn upload_document(
            &self,
            _kind: UploadKind,
            _payload: &UploadPayload,
        ) -> Result<UploadReceipt, ApiError> {
            self.upload_calls.fetch_add(1, Ordering::SeqCst);
            match self.fail_status {
                Some(status) => Err(ApiError::Api {
                    status,
                    message: "upload rejected".to_string(),
                }),
                None => Ok(UploadReceipt {
                    message: "Document uploaded successfully".to_string(),
                    filename: None,
                }),
            }
        }

        async fn analyze(&self, _request: &AnalyzeRequest) -> Result<AnalyzeResponse, ApiError> {
            unimplemented!("not exercised by upload tests")
        }

        async fn fetch_history(&self, _limit: u32) -> Result<Vec<RawHistoryEntry>, ApiError> {
            Ok(Vec::new())
        }
    }

    fn make_coordinator(api: Arc<FakeApi>) -> (UploadCoordinator, Arc<StageController>) {
        let stages = Arc::new(StageController::new(Duration::from_millis(1500)));
        (
            UploadCoordinator::new(api, Arc::clone(&stages)),
            stages,
        )
    }

    fn pdf_payload() -> UploadPayload {
        UploadPayload::from_file(
            "resume.pdf",
            "application/pdf",
            Bytes::from_static(b"%PDF-1.4 fake"),
        )
    }

    // ── validation ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_empty_payload_is_rejected_without_network_call() {
        let api = FakeApi::ok();
        let (coordinator, _) = make_coordinator(Arc::clone(&api));

        let err = coordinator
            .submit(UploadKind::Cv, UploadPayload::Text(String::new()))
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "Please provide either text or upload a file");
        assert_eq!(api.upload_calls.load(Ordering::SeqCst), 0);
        assert!(matches!(
            coordinator.slot_state(UploadKind::Cv).await,
            SlotState::Error { .. }
        ));
    }

    #[tokio::test]
    async fn test_blank_text_counts_as_missing() {
        let api = FakeApi::ok();
        let (coordinator, _) = make_coordinator(Arc::clone(&api));

        let err = coordinator
            .submit(UploadKind::JobListing, UploadPayload::Text("   \n\t ".to_string()))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Input(_)));
        assert_eq!(api.upload_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_disallowed_format_is_rejected() {
        let api = FakeApi::ok();
        let (coordinator, _) = make_coordinator(Arc::clone(&api));

        let payload =
            UploadPayload::from_file("scan.png", "image/png", Bytes::from_static(b"\x89PNG"));
        let err = coordinator
            .submit(UploadKind::Cv, payload)
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "Please upload a PDF or Word document");
        assert_eq!(api.upload_calls.load(Ordering::SeqCst), 0);
        match coordinator.slot_state(UploadKind::Cv).await {
            SlotState::Error { message } => {
                assert_eq!(message, "Please upload a PDF or Word document")
            }
            other => panic!("slot should be Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_all_allowed_formats_pass_validation() {
        let api = FakeApi::ok();
        let (coordinator, _) = make_coordinator(Arc::clone(&api));

        for (name, ext) in [("a.pdf", "pdf"), ("b.doc", "doc"), ("c.docx", "docx")] {
            let mime = content_type_for_extension(ext).unwrap();
            let payload = UploadPayload::from_file(name, mime, Bytes::from_static(b"data"));
            coordinator.submit(UploadKind::Cv, payload).await.unwrap();
        }
        assert_eq!(api.upload_calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_unknown_extension_has_no_content_type() {
        assert_eq!(content_type_for_extension("pdf"), Some("application/pdf"));
        assert_eq!(content_type_for_extension("PDF"), Some("application/pdf"));
        assert_eq!(content_type_for_extension("txt"), None);
        assert_eq!(content_type_for_extension("png"), None);
    }

    // ── lifecycle ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_success_records_backend_message() {
        let api = FakeApi::ok();
        let (coordinator, _) = make_coordinator(api);

        coordinator
            .submit(UploadKind::JobListing, UploadPayload::Text("Senior Rust role".to_string()))
            .await
            .unwrap();

        assert_eq!(
            coordinator.slot_state(UploadKind::JobListing).await,
            SlotState::Success {
                message: "Document uploaded successfully".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_server_failure_marks_slot_error() {
        let api = FakeApi::failing(500);
        let (coordinator, stages) = make_coordinator(api);

        let err = coordinator
            .submit(UploadKind::Cv, pdf_payload())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Server { status: 500, .. }));
        assert!(matches!(
            coordinator.slot_state(UploadKind::Cv).await,
            SlotState::Error { .. }
        ));
        assert!(!stages.has_auto_advanced());
    }

    #[tokio::test]
    async fn test_failure_leaves_other_slot_untouched() {
        let api = FakeApi::ok();
        let (coordinator, _) = make_coordinator(Arc::clone(&api));

        coordinator
            .submit(UploadKind::JobListing, UploadPayload::Text("role text".to_string()))
            .await
            .unwrap();
        coordinator
            .submit(UploadKind::Cv, UploadPayload::Text(String::new()))
            .await
            .unwrap_err();

        assert!(coordinator.slot_state(UploadKind::JobListing).await.is_success());
        assert!(!coordinator.both_succeeded().await);
    }

    // ── auto-advance ────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_both_successes_arm_match_transition() {
        let api = FakeApi::ok();
        let (coordinator, stages) = make_coordinator(api);

        coordinator
            .submit(UploadKind::JobListing, UploadPayload::Text("role text".to_string()))
            .await
            .unwrap();
        assert!(!stages.has_auto_advanced());

        coordinator
            .submit(UploadKind::Cv, pdf_payload())
            .await
            .unwrap();
        assert!(stages.has_auto_advanced());
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_millis(1500)).await;
        tokio::task::yield_now().await;
        assert_eq!(stages.current().await, Stage::Match);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reupload_does_not_rearm_transition() {
        let api = FakeApi::ok();
        let (coordinator, stages) = make_coordinator(api);

        coordinator
            .submit(UploadKind::JobListing, UploadPayload::Text("v1".to_string()))
            .await
            .unwrap();
        coordinator
            .submit(UploadKind::Cv, pdf_payload())
            .await
            .unwrap();
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(1500)).await;
        tokio::task::yield_now().await;
        assert_eq!(stages.current().await, Stage::Match);

        // User navigates on, then replaces a document. No second jump.
        stages.advance_to(Stage::Generate).await;
        coordinator
            .submit(UploadKind::Cv, pdf_payload())
            .await
            .unwrap();
        tokio::time::advance(Duration::from_millis(1500)).await;
        tokio::task::yield_now().await;
        assert_eq!(stages.current().await, Stage::Generate);
    }
}
