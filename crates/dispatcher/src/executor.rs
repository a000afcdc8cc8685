//! Corrective actions for a violating pull request.
//!
//! One violation becomes one detached tokio task that closes the pull
//! request and posts the comment. The two requests run concurrently and are
//! independent: a failed close does not stop the comment, and neither failure
//! leaves the task. Nothing is retried.

use std::sync::Arc;

use pipeline::{PullRequestManager, PullRequestRef, ViolationReport};
use tokio::task::JoinHandle;
use tracing::{debug, info, Instrument};

/// Launches the close and comment requests for violations.
#[derive(Clone)]
pub struct ActionExecutor {
    manager: Arc<dyn PullRequestManager>,
}

impl ActionExecutor {
    /// Creates an executor acting through `manager`.
    pub fn new(manager: Arc<dyn PullRequestManager>) -> Self {
        Self { manager }
    }

    /// Spawns the corrective actions on the current tokio runtime.
    ///
    /// The caller may drop the returned handle; the task keeps running.
    pub fn launch(&self, pull_request: PullRequestRef, comment: String) -> JoinHandle<ViolationReport> {
        let manager = Arc::clone(&self.manager);
        let span = tracing::info_span!("corrective_actions", pull_request = %pull_request);
        tokio::spawn(execute(manager, pull_request, comment).instrument(span))
    }

    /// Runs the corrective actions to completion on the calling task.
    pub async fn execute(&self, pull_request: PullRequestRef, comment: String) -> ViolationReport {
        execute(Arc::clone(&self.manager), pull_request, comment).await
    }
}

async fn execute(
    manager: Arc<dyn PullRequestManager>,
    pull_request: PullRequestRef,
    comment: String,
) -> ViolationReport {
    // join! polls its branches in declaration order on the first poll, so the
    // close request is always initiated before the comment request.
    let (close, comment) = tokio::join!(
        manager.close_pull_request(&pull_request),
        manager.create_comment(&pull_request, &comment),
    );

    if close.is_success() && comment.is_success() {
        info!(pull_request = %pull_request, "Pull request closed and commented");
    } else {
        debug!(
            pull_request = %pull_request,
            close = ?close,
            comment = ?comment,
            "Corrective actions finished with failures"
        );
    }

    ViolationReport {
        pull_request,
        close,
        comment,
    }
}
