//! Port traits implemented by infrastructure crates.
//!
//! The dispatcher only ever talks to these traits. `listener` supplies the
//! [`EventSource`]; `github` supplies the [`PullRequestManager`].

use async_trait::async_trait;

use crate::{ActionOutcome, EventRecord, PullRequestRef};

/// A FIFO queue of event records fed by an intake worker running elsewhere.
#[async_trait]
pub trait EventSource: Send {
    /// Waits for the next record.
    ///
    /// Returns `None` once the source is closed and drained; the caller stops
    /// serving at that point.
    async fn next_event(&mut self) -> Option<EventRecord>;
}

/// Remote mutations on a pull request.
///
/// Implementations never return errors: every failure is reported as an
/// [`ActionOutcome`] and logged where it happens. Neither operation retries.
#[async_trait]
pub trait PullRequestManager: Send + Sync + 'static {
    /// Transitions the pull request to `closed`.
    async fn close_pull_request(&self, pull_request: &PullRequestRef) -> ActionOutcome;

    /// Posts `body` as a new comment on the pull request.
    async fn create_comment(&self, pull_request: &PullRequestRef, body: &str) -> ActionOutcome;
}
