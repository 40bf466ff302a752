//! Cooperative cancellation and progress reporting for a generation run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cloneable flag checked by the search before every node.
///
/// Clones share the flag, so a caller can keep one handle and give another to
/// the worker running the search.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Receives progress percentages (0..=100) synchronously on the searching thread.
///
/// Progress is computed as `assigned * 100 / total` after every commit. Because
/// backtracking retracts assignments, the reported values go down as well as
/// up: treat them as an approximate indicator, never as a monotonic counter.
pub trait ProgressSink {
    fn report(&self, percent: u32);
}

impl<F> ProgressSink for F
where
    F: Fn(u32),
{
    fn report(&self, percent: u32) {
        self(percent)
    }
}
