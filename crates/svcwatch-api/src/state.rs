//! Application state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use svcwatch_monitor::{ServiceRegistry, TransitionRecorder};
use svcwatch_protocols::Store;

/// Application state shared across handlers.
pub struct AppState {
    pub registry: Arc<ServiceRegistry>,
    pub recorder: TransitionRecorder,
    start_time: Instant,
}

impl AppState {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        let recorder = TransitionRecorder::new(registry.store());
        Self {
            registry,
            recorder,
            start_time: Instant::now(),
        }
    }

    /// State over a bare store, with a cold registry cache.
    pub fn from_store(store: Arc<dyn Store>) -> Self {
        Self::new(Arc::new(ServiceRegistry::new(store)))
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}
