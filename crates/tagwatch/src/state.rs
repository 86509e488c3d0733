//! Application state shared between the display consumer and the API.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tagwatch_core::Snapshot;
use tokio::sync::RwLock;

/// Shared application state. Cloning yields another handle to the same state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

/// Handler-facing name for [`AppState`].
pub type SharedState = AppState;

struct AppStateInner {
    latest: RwLock<Option<Snapshot>>,
    started_at: DateTime<Utc>,
}

impl AppState {
    /// Create state with no snapshot yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                latest: RwLock::new(None),
                started_at: Utc::now(),
            }),
        }
    }

    /// Replace the latest snapshot.
    pub async fn publish(&self, snapshot: Snapshot) {
        *self.inner.latest.write().await = Some(snapshot);
    }

    /// Copy of the latest snapshot, if one has been published.
    pub async fn latest(&self) -> Option<Snapshot> {
        self.inner.latest.read().await.clone()
    }

    /// When this process started tracking.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
