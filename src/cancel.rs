//! Cooperative request cancellation.
//!
//! A [`CancelToken`] / [`Canceler`] pair lets one piece of code abort a
//! request that another piece of code started. The token travels inside
//! the request config; the canceler stays with whoever may need to pull
//! the plug:
//!
//! ```rust
//! use courier::CancelToken;
//!
//! let (token, canceler) = CancelToken::source();
//! // hand `token` to a request config, keep `canceler`...
//! canceler.cancel("operation aborted by user");
//! assert!(token.is_cancelled());
//! ```
//!
//! Cancellation is level-triggered and sticky: the first
//! [`cancel()`](Canceler::cancel) wins, every later call is a no-op, and
//! a token once cancelled stays cancelled. Dispatch checks the token at
//! three points (before the adapter, while the exchange is in flight,
//! and after it settles), so a request observes at most one
//! cancellation error. If every [`Canceler`] is dropped without firing,
//! the token simply can never be cancelled; in-flight requests run to
//! completion.

use futures_channel::oneshot;
use futures_util::FutureExt;
use futures_util::future::Shared;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::util::lock_or_clear;

/// The reason a request was cancelled.
///
/// Carries the optional message passed to [`Canceler::cancel()`].
/// Errors produced from a cancellation use [`Display`](fmt::Display),
/// which falls back to `"canceled"` when no message was given.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cancellation {
    message: Option<String>,
}

impl Cancellation {
    /// Create a cancellation reason with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// The message passed to [`Canceler::cancel()`], if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for Cancellation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(m) if !m.is_empty() => f.write_str(m),
            _ => f.write_str("canceled"),
        }
    }
}

struct Inner {
    /// First-cancel-wins slot. `Some` from the moment of cancellation.
    reason: Mutex<Option<Cancellation>>,
    /// One-shot trigger consumed by the first effective `cancel()`.
    trigger: Mutex<Option<oneshot::Sender<Cancellation>>>,
    /// Cloneable waiter resolved by the trigger.
    waiter: Shared<oneshot::Receiver<Cancellation>>,
}

/// Observer half of a cancellation pair.
///
/// Cheap to clone; all clones share the same cancellation state. Stored
/// in [`RequestConfig::cancel_token`](crate::RequestConfig::cancel_token)
/// and polled by dispatch.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

/// Trigger half of a cancellation pair.
///
/// Cheap to clone; the first clone to call [`cancel()`](Self::cancel)
/// wins.
#[derive(Clone)]
pub struct Canceler {
    inner: Arc<Inner>,
}

impl CancelToken {
    /// Create a token, handing the matching [`Canceler`] to `executor`.
    ///
    /// The executor runs synchronously before `new()` returns, so the
    /// canceler can be stashed wherever the caller needs it:
    ///
    /// ```rust
    /// use courier::{CancelToken, Canceler};
    ///
    /// let mut canceler: Option<Canceler> = None;
    /// let token = CancelToken::new(|c| canceler = Some(c));
    /// canceler.unwrap().cancel("done waiting");
    /// assert!(token.is_cancelled());
    /// ```
    pub fn new(executor: impl FnOnce(Canceler)) -> CancelToken {
        let (token, canceler) = CancelToken::source();
        executor(canceler);
        token
    }

    /// Create a token together with its [`Canceler`].
    pub fn source() -> (CancelToken, Canceler) {
        let (tx, rx) = oneshot::channel();
        let inner = Arc::new(Inner {
            reason: Mutex::new(None),
            trigger: Mutex::new(Some(tx)),
            waiter: rx.shared(),
        });
        (
            CancelToken {
                inner: Arc::clone(&inner),
            },
            Canceler { inner },
        )
    }

    /// Whether this token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        lock_or_clear(&self.inner.reason).is_some()
    }

    /// The cancellation reason, if the token has been cancelled.
    pub fn reason(&self) -> Option<Cancellation> {
        lock_or_clear(&self.inner.reason).clone()
    }

    /// Fail fast if this token has been cancelled.
    ///
    /// Returns the cancellation as an [`Error`](crate::Error) with
    /// [`is_cancelled()`](crate::Error::is_cancelled) set. Dispatch
    /// calls this before handing a request to the adapter and again
    /// after the exchange settles.
    pub fn ensure_not_cancelled(&self) -> crate::Result<()> {
        match self.reason() {
            Some(reason) => Err(crate::Error::cancelled(reason)),
            None => Ok(()),
        }
    }

    /// Resolve once the token is cancelled.
    ///
    /// If every [`Canceler`] is dropped without firing, the future
    /// never resolves; callers race it against the work they want to
    /// abort.
    pub async fn cancelled(&self) -> Cancellation {
        match self.inner.waiter.clone().await {
            Ok(reason) => reason,
            // All cancelers gone without firing: cancellation can no
            // longer happen.
            Err(oneshot::Canceled) => std::future::pending().await,
        }
    }
}

impl Canceler {
    /// Cancel the paired token.
    ///
    /// The first call wins: it records the reason and wakes every
    /// [`CancelToken::cancelled()`] waiter. Later calls (from this or
    /// any cloned canceler) are no-ops and do not overwrite the reason.
    pub fn cancel(&self, message: impl Into<String>) {
        let reason = Cancellation::new(message);
        {
            // Safe to recover from poison: `reason` is a write-once slot.
            let mut slot = lock_or_clear(&self.inner.reason);
            if slot.is_some() {
                return;
            }
            *slot = Some(reason.clone());
        }
        // Safe to recover from poison: `trigger` is an `Option::take` slot.
        if let Some(tx) = lock_or_clear(&self.inner.trigger).take() {
            // The waiter is owned by `Inner`, so the send cannot fail
            // while any token clone is alive.
            let _ = tx.send(reason);
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl fmt::Debug for Canceler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canceler")
            .field("fired", &lock_or_clear(&self.inner.trigger).is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn source_starts_uncancelled() {
        let (token, _canceler) = CancelToken::source();
        assert!(!token.is_cancelled());
        assert!(token.reason().is_none());
        assert!(token.ensure_not_cancelled().is_ok());
    }

    #[test]
    fn cancel_resolves_waiter() {
        let (token, canceler) = CancelToken::source();
        canceler.cancel("stop now");
        let reason = futures_executor::block_on(token.cancelled());
        assert_eq!(reason.message(), Some("stop now"));
    }

    #[test]
    fn cancel_from_another_thread() {
        let (token, canceler) = CancelToken::source();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            canceler.cancel("background stop");
        });
        let reason = futures_executor::block_on(token.cancelled());
        assert_eq!(reason.message(), Some("background stop"));
        assert!(token.is_cancelled());
    }

    #[test]
    fn first_cancel_wins() {
        let (token, canceler) = CancelToken::source();
        let second = canceler.clone();
        canceler.cancel("first");
        second.cancel("second");
        assert_eq!(token.reason().unwrap().message(), Some("first"));
    }

    #[test]
    fn ensure_not_cancelled_after_cancel() {
        let (token, canceler) = CancelToken::source();
        canceler.cancel("aborted");
        let err = token.ensure_not_cancelled().unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(err.to_string(), "aborted");
        // Sticky: still cancelled on re-check.
        assert!(token.ensure_not_cancelled().is_err());
    }

    #[test]
    fn executor_runs_synchronously() {
        let mut grabbed = None;
        let token = CancelToken::new(|canceler| grabbed = Some(canceler));
        let canceler = grabbed.expect("executor should run before new() returns");
        assert!(!token.is_cancelled());
        canceler.cancel("later");
        assert!(token.is_cancelled());
    }

    #[test]
    fn token_clones_share_state() {
        let (token, canceler) = CancelToken::source();
        let other = token.clone();
        canceler.cancel("shared");
        assert!(token.is_cancelled());
        assert!(other.is_cancelled());
        let reason = futures_executor::block_on(other.cancelled());
        assert_eq!(reason.message(), Some("shared"));
    }

    #[test]
    fn dropped_canceler_never_resolves() {
        let (token, canceler) = CancelToken::source();
        drop(canceler);
        assert!(!token.is_cancelled());
        // The waiter must stay pending rather than resolve with a
        // phantom cancellation.
        assert!(token.cancelled().now_or_never().is_none());
        assert!(token.ensure_not_cancelled().is_ok());
    }

    #[test]
    fn cancellation_display() {
        let cases = [
            ("with message", Cancellation::new("user gave up"), "user gave up"),
            ("empty message", Cancellation::new(""), "canceled"),
            ("default", Cancellation::default(), "canceled"),
        ];
        for (label, reason, expected) in cases {
            assert_eq!(reason.to_string(), expected, "{label}");
        }
    }

    #[test]
    fn debug_reflects_state() {
        let (token, canceler) = CancelToken::source();
        assert!(format!("{token:?}").contains("cancelled: false"));
        assert!(format!("{canceler:?}").contains("fired: false"));
        canceler.cancel("x");
        assert!(format!("{token:?}").contains("cancelled: true"));
        assert!(format!("{canceler:?}").contains("fired: true"));
    }
}
