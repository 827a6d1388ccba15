//! Session-lifetime wiring for one matcher flow.
//!
//! There is no global state: every subsystem hangs off this context, which
//! is built once per flow and handed to whoever drives it. All shared
//! pieces sit behind `Arc`, so the context clones cheaply and clones see
//! the same slots, stages, and caches.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::api::{HttpMatcherApi, MatcherApi};
use crate::config::Config;
use crate::generate::GenerationFlow;
use crate::history::HistoryStore;
use crate::stage::StageController;
use crate::upload::UploadCoordinator;

/// Shared session state injected into the driver and tests.
#[derive(Clone)]
pub struct SessionContext {
    pub config: Config,
    pub api: Arc<dyn MatcherApi>,
    pub stages: Arc<StageController>,
    pub uploads: Arc<UploadCoordinator>,
    pub history: Arc<HistoryStore>,
    pub flow: Arc<GenerationFlow>,
    /// Correlates log events from one flow run.
    pub session_id: Uuid,
}

impl SessionContext {
    /// Wires the real HTTP client from configuration.
    pub fn new(config: Config) -> Self {
        let api: Arc<dyn MatcherApi> = Arc::new(HttpMatcherApi::new(
            config.api_base_url.clone(),
            config.request_timeout_secs,
        ));
        Self::with_api(config, api)
    }

    /// Same wiring with an injected API implementation. Tests hand in a
    /// fake here.
    pub fn with_api(config: Config, api: Arc<dyn MatcherApi>) -> Self {
        let stages = Arc::new(StageController::new(Duration::from_millis(
            config.auto_advance_delay_ms,
        )));
        let uploads = Arc::new(UploadCoordinator::new(
            Arc::clone(&api),
            Arc::clone(&stages),
        ));
        let history = Arc::new(HistoryStore::new(Arc::clone(&api), config.history_limit));
        let flow = Arc::new(GenerationFlow::new(Arc::clone(&api), Arc::clone(&history)));

        Self {
            config,
            api,
            stages,
            uploads,
            history,
            flow,
            session_id: Uuid::new_v4(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::models::{
        AnalyzeRequest, AnalyzeResponse, GenerationRecord, RawHistoryEntry, UploadReceipt,
    };
    use crate::stage::Stage;
    use crate::upload::{UploadKind, UploadPayload};
    use async_trait::async_trait;

    struct NullApi;

    #[async_trait]
    impl MatcherApi for NullApi {
        async fn upload_document(
            &self,
            _kind: UploadKind,
            _payload: &UploadPayload,
        ) -> Result<UploadReceipt, ApiError> {
            unimplemented!("not exercised by session tests")
        }

        async fn analyze(&self, _request: &AnalyzeRequest) -> Result<AnalyzeResponse, ApiError> {
            unimplemented!("not exercised by session tests")
        }

        async fn fetch_history(&self, _limit: u32) -> Result<Vec<RawHistoryEntry>, ApiError> {
            unimplemented!("not exercised by session tests")
        }
    }

    fn make_config() -> Config {
        Config {
            api_base_url: "http://localhost:5001".to_string(),
            request_timeout_secs: 30,
            auto_advance_delay_ms: 1500,
            history_limit: 10,
            cv_path: None,
            job_path: None,
            output_dir: ".".to_string(),
            use_sample_data: false,
            github_username: None,
            linkedin_url: None,
            rust_log: "info".to_string(),
        }
    }

    fn make_session() -> SessionContext {
        SessionContext::with_api(make_config(), Arc::new(NullApi))
    }

    #[tokio::test]
    async fn test_session_starts_at_the_upload_stage() {
        let session = make_session();
        assert_eq!(session.stages.current().await, Stage::Upload);
        assert!(session.flow.current().await.is_none());
    }

    #[tokio::test]
    async fn test_clones_share_one_current_record_slot() {
        let session = make_session();
        let clone = session.clone();

        clone
            .flow
            .set_current(GenerationRecord {
                tailored_resume: "Shared".to_string(),
                ..Default::default()
            })
            .await;

        assert_eq!(
            session.flow.current().await.unwrap().tailored_resume,
            "Shared"
        );
        assert_eq!(session.session_id, clone.session_id);
    }

    #[test]
    fn test_each_session_gets_its_own_id() {
        let a = make_session();
        let b = make_session();
        assert_ne!(a.session_id, b.session_id);
    }
}
