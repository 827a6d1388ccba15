//! Pipeline stage tracking.
//!
//! The matcher workflow is presented as seven stages. Navigation between
//! them is free in both directions; the only automatic movement is a
//! single Upload → Match transition, armed exactly once when both
//! documents have uploaded successfully and fired after a short delay so
//! the success state stays visible.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// One step of the matcher workflow, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "upload")]
    Upload,
    #[serde(rename = "match")]
    Match,
    #[serde(rename = "generate")]
    Generate,
    #[serde(rename = "gap")]
    GapAnalysis,
    #[serde(rename = "interview")]
    InterviewPrep,
    #[serde(rename = "apply")]
    Apply,
    #[serde(rename = "track")]
    Track,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Upload,
        Stage::Match,
        Stage::Generate,
        Stage::GapAnalysis,
        Stage::InterviewPrep,
        Stage::Apply,
        Stage::Track,
    ];

    /// Human-readable tab label.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Upload => "Upload",
            Stage::Match => "Job Match",
            Stage::Generate => "Generate CV",
            Stage::GapAnalysis => "Gap Analysis",
            Stage::InterviewPrep => "Interview Prep",
            Stage::Apply => "Apply",
            Stage::Track => "Track",
        }
    }

    /// Stable identifier, also used as the serialized form.
    pub fn slug(&self) -> &'static str {
        match self {
            Stage::Upload => "upload",
            Stage::Match => "match",
            Stage::Generate => "generate",
            Stage::GapAnalysis => "gap",
            Stage::InterviewPrep => "interview",
            Stage::Apply => "apply",
            Stage::Track => "track",
        }
    }

    #[allow(dead_code)]
    pub fn from_slug(slug: &str) -> Option<Stage> {
        Stage::ALL.iter().copied().find(|stage| stage.slug() == slug)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Controller
// ────────────────────────────────────────────────────────────────────────────

/// Tracks the active stage and owns the one-shot auto-advance timer.
pub struct StageController {
    stage: Mutex<Stage>,
    auto_advance_delay: Duration,
    /// Set the first time the Upload → Match transition is armed. Never
    /// reset: later upload successes must not re-trigger the jump.
    auto_advanced: AtomicBool,
}

impl StageController {
    pub fn new(auto_advance_delay: Duration) -> Self {
        Self {
            stage: Mutex::new(Stage::Upload),
            auto_advance_delay,
            auto_advanced: AtomicBool::new(false),
        }
    }

    pub async fn current(&self) -> Stage {
        *self.stage.lock().await
    }

    /// Moves to `stage`. Every stage is reachable from every other; there
    /// is no forward-only ordering to enforce.
    pub async fn advance_to(&self, stage: Stage) {
        let mut current = self.stage.lock().await;
        let from = *current;
        *current = stage;
        if from != stage {
            info!(from = from.slug(), to = stage.slug(), "stage transition");
        }
    }

    /// Arms the delayed Upload → Match transition. Returns `false` if the
    /// transition was already armed by an earlier call; the timer fires at
    /// most once per session regardless of how often uploads succeed.
    pub fn schedule_match_transition(self: &Arc<Self>) -> bool {
        if self
            .auto_advanced
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("auto-advance already armed; ignoring");
            return false;
        }

        info!(delay_ms = self.auto_advance_delay.as_millis() as u64, "arming auto-advance to Job Match");
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(controller.auto_advance_delay).await;
            controller.advance_to(Stage::Match).await;
        });
        true
    }

    /// Whether the one-shot Upload → Match transition has already been
    /// armed this session.
    pub fn has_auto_advanced(&self) -> bool {
        self.auto_advanced.load(Ordering::Acquire)
    }
}
