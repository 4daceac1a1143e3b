//! Shared health state for the /health endpoint.
//! Updated by the review and insights handlers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Run counters. Written by request handlers, read by the API.
#[derive(Default)]
pub struct HealthState {
    /// Completed review retrievals since startup (all sources).
    pub retrievals_run: AtomicU64,
    /// Completed analysis runs since startup.
    pub analyses_run: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_retrievals(&self) {
        self.retrievals_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_analyses(&self) {
        self.analyses_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn retrievals_run(&self) -> u64 {
        self.retrievals_run.load(Ordering::Relaxed)
    }

    pub fn analyses_run(&self) -> u64 {
        self.analyses_run.load(Ordering::Relaxed)
    }
}
