//! Request context carried through every client and driver operation.
//!
//! A [`Context`] bundles an optional deadline, a request id and a cancellation flag.
//! The adapter layer never inspects it; it hands the same context to the wrapped
//! client, which decides what cancellation and timeouts mean.

use chrono::{DateTime, Duration, Utc};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use uuid::Uuid;

use crate::error::{DocError, DocResult};

/// Cancellation and deadline scope for a single logical request.
///
/// Clones share the cancellation flag, so cancelling any clone cancels them all.
#[derive(Debug, Clone)]
pub struct Context {
    request_id: Uuid,
    deadline: Option<DateTime<Utc>>,
    cancelled: Arc<AtomicBool>,
}

impl Context {
    /// Creates a context with a fresh request id and no deadline.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            deadline: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns a copy of this context that expires at `deadline`.
    ///
    /// The copy keeps the request id and shares the cancellation flag.
    pub fn with_deadline(&self, deadline: DateTime<Utc>) -> Self {
        Self {
            deadline: Some(deadline),
            ..self.clone()
        }
    }

    /// Returns a copy of this context that expires `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Utc::now() + timeout)
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Cancels this context and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns an error if the context was cancelled or its deadline has passed.
    ///
    /// Clients call this before doing work on behalf of the context.
    pub fn check(&self) -> DocResult<()> {
        if self.is_cancelled() {
            return Err(DocError::Canceled);
        }

        match self.deadline {
            Some(deadline) if Utc::now() >= deadline => Err(DocError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
