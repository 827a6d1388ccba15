//! Client-side cache of past generation runs.
//!
//! The backend answers history queries in whatever order its store yields,
//! so ordering is enforced here: entries are sorted newest-first on every
//! refresh. A refresh replaces the cache wholesale rather than merging, and
//! `load` is strictly cache-only: selecting a past run never touches the
//! network.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::api::MatcherApi;
use crate::errors::ClientError;
use crate::models::HistoryEntry;

pub struct HistoryStore {
    api: Arc<dyn MatcherApi>,
    limit: u32,
    entries: Mutex<Vec<HistoryEntry>>,
}

impl HistoryStore {
    pub fn new(api: Arc<dyn MatcherApi>, limit: u32) -> Self {
        Self {
            api,
            limit,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Re-fetches the newest entries and replaces the cache with them,
    /// sorted newest-first. On failure the previous cache is kept.
    pub async fn refresh(&self) -> Result<Vec<HistoryEntry>, ClientError> {
        let raw = match self.api.fetch_history(self.limit).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "history refresh failed, keeping cached entries");
                return Err(err.into());
            }
        };

        let mut entries: Vec<HistoryEntry> =
            raw.into_iter().map(|e| e.into_entry()).collect();
        // Stable sort: entries with equal timestamps keep backend order.
        entries.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));

        debug!(count = entries.len(), "history refreshed");
        *self.entries.lock().await = entries.clone();
        Ok(entries)
    }

    /// Snapshot of the cached entries, newest first.
    pub async fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.lock().await.clone()
    }

    /// Looks an entry up by id in the cache. Never fetches; an id that has
    /// fallen out of the cached window yields `None`.
    pub async fn load(&self, id: &str) -> Option<HistoryEntry> {
        self.entries
            .lock()
            .await
            .iter()
            .find(|entry| entry.id == id)
            .cloned()
    }
}
