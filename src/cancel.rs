//! Cooperative cancellation for catalog fetches and batch resolution.
//!
//! Long-running operations check the token between collaborator calls, never
//! in the middle of one. A cancelled operation returns [`Completion::Cancelled`],
//! which is neither a success value nor an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag. Cancelling any clone cancels all of them.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Result of a cancellable operation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Completion<T> {
    Finished(T),
    Cancelled,
}

impl<T> Completion<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Completion::Cancelled)
    }

    /// The finished value, or `None` when cancelled.
    pub fn finished(self) -> Option<T> {
        match self {
            Completion::Finished(value) => Some(value),
            Completion::Cancelled => None,
        }
    }
}
