//! Execution context: cooperative cancellation and deadlines.
//!
//! A [`Context`] is supplied at execution time (`prepare`/`send`), never stored
//! by builder mutators. The engine does not poll it; it hands the context to the
//! network client, which is expected to honor it, and only consults
//! [`Context::error`] after a transport failure to prefer reporting the
//! cancellation cause over the raw transport error.
//!
//! # Examples
//!
//! ```rust
//! use request_kit::Context;
//! use std::time::Duration;
//!
//! let cx = Context::with_timeout(Duration::from_secs(5));
//! assert!(!cx.is_done());
//!
//! let (cx, cancel) = Context::background().with_cancel();
//! cancel.cancel();
//! assert!(cx.is_canceled());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Error;

/// An ambient cancellation/deadline signal for a single execution.
///
/// Contexts are cheap to clone; clones observe the same cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    canceled: Option<Arc<AtomicBool>>,
}

impl Context {
    /// Creates a context with no deadline and no cancellation.
    pub fn background() -> Self {
        Self::default()
    }

    /// Creates a context that expires at the given instant.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            canceled: None,
        }
    }

    /// Creates a context that expires after the given duration.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Attaches a cancellation flag, returning the derived context and the
    /// handle that trips it.
    pub fn with_cancel(self) -> (Self, CancelHandle) {
        let flag = Arc::new(AtomicBool::new(false));
        let context = Self {
            deadline: self.deadline,
            canceled: Some(flag.clone()),
        };
        (context, CancelHandle { flag })
    }

    /// Returns the deadline, if one is set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true if the context has been canceled.
    pub fn is_canceled(&self) -> bool {
        self.canceled
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    /// Returns true if the context has been canceled or its deadline passed.
    pub fn is_done(&self) -> bool {
        self.error().is_some()
    }

    /// Returns the reason the context ended, if it has.
    ///
    /// Cancellation takes precedence over an expired deadline.
    pub fn error(&self) -> Option<Error> {
        if self.is_canceled() {
            return Some(Error::canceled());
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Some(Error::deadline_exceeded());
        }
        None
    }
}

/// Trips the cancellation flag of the [`Context`] it was derived from.
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Cancels the associated context. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("canceled", &self.flag.load(Ordering::Acquire))
            .finish()
    }
}
