//! Application state shared across request handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::provider::{ClusterProvider, MachineTemplater};

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    clusters: Arc<dyn ClusterProvider>,
    templater: Arc<dyn MachineTemplater>,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(
        clusters: Arc<dyn ClusterProvider>,
        templater: Arc<dyn MachineTemplater>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                clusters,
                templater,
                request_timeout,
            }),
        }
    }

    pub fn clusters(&self) -> &dyn ClusterProvider {
        self.inner.clusters.as_ref()
    }

    pub fn templater(&self) -> &dyn MachineTemplater {
        self.inner.templater.as_ref()
    }

    /// Deadline applied to every worker operation.
    pub fn request_timeout(&self) -> Duration {
        self.inner.request_timeout
    }
}
