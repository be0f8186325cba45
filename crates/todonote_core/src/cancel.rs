//! Cooperative cancellation signal for store operations.
//!
//! # Responsibility
//! - Carry a caller-owned "stop now" flag into every repository call.
//! - Let the SQLite backend abort an in-flight statement when the flag fires.
//!
//! # Invariants
//! - Cancellation is one-way: a fired token never resets.
//! - Clones share the same flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag handed to repository and service calls.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the token. Every clone observes the change.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns whether the token has fired.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
