//! The dispatch loop.
//!
//! Drains an [`EventSource`] in FIFO order. Each record is classified on the
//! loop's own task; violations hand off to the [`ActionExecutor`], whose task
//! is never awaited here, so slow API calls cannot stall intake. While the
//! source is empty the loop is parked on it.
//!
//! There is no deduplication. A redelivered webhook is a new record and is
//! acted on again.

use std::sync::Arc;

use pipeline::{
    CommentSelector, EventPayload, EventRecord, EventSource, PolicyEvaluator, PullRequestManager,
    UnexpectedEventPolicy, ViolationReport,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::ActionExecutor;

/// Read-only settings for the dispatch loop, resolved once at startup.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Decides which pull request events are violations.
    pub policy: PolicyEvaluator,
    /// Produces the comment for each violation.
    pub comments: CommentSelector,
    /// What to do with deliveries that are not `pull_request` events.
    pub on_unexpected_event: UnexpectedEventPolicy,
}

/// What [`Dispatcher::process`] did with a record.
#[derive(Debug)]
pub enum Disposition {
    /// Not a violation; nothing was launched.
    Ignored,
    /// A violation; the corrective actions run on the detached task behind this handle.
    ViolationLaunched(JoinHandle<ViolationReport>),
    /// The record is not a `pull_request` event and was rejected before
    /// classification.
    UnexpectedKind {
        /// The foreign event kind.
        kind: String,
    },
}

/// Why [`Dispatcher::run`] stopped serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchExit {
    /// The event source closed.
    SourceClosed,
    /// An event of a foreign kind arrived under [`UnexpectedEventPolicy::Stop`].
    UnexpectedEvent {
        /// The foreign event kind.
        kind: String,
    },
}

/// Classifies event records and launches corrective actions.
pub struct Dispatcher {
    config: DispatcherConfig,
    executor: ActionExecutor,
}

impl Dispatcher {
    /// Creates a dispatcher acting through `manager`.
    pub fn new(config: DispatcherConfig, manager: Arc<dyn PullRequestManager>) -> Self {
        Self {
            config,
            executor: ActionExecutor::new(manager),
        }
    }

    /// Serves records from `source` until it closes or, under
    /// [`UnexpectedEventPolicy::Stop`], a foreign event kind arrives.
    pub async fn run<S: EventSource + ?Sized>(&self, source: &mut S) -> DispatchExit {
        info!(
            protected_branch = %self.config.policy.protected_branch(),
            on_unexpected_event = ?self.config.on_unexpected_event,
            "Dispatch loop started"
        );

        while let Some(record) = source.next_event().await {
            match self.process(record) {
                Disposition::UnexpectedKind { kind } => match self.config.on_unexpected_event {
                    UnexpectedEventPolicy::Stop => {
                        warn!(kind = %kind, "Dispatch loop stopping on unexpected event kind");
                        return DispatchExit::UnexpectedEvent { kind };
                    }
                    UnexpectedEventPolicy::Skip => {}
                },
                // Detached: the actions finish on their own.
                Disposition::ViolationLaunched(_) | Disposition::Ignored => {}
            }
        }

        info!("Event source closed; dispatch loop stopped");
        DispatchExit::SourceClosed
    }

    /// Classifies one record, launching the corrective actions for a violation.
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(skip_all, fields(delivery = %record.delivery_id, kind = record.kind()))]
    pub fn process(&self, record: EventRecord) -> Disposition {
        let event = match record.payload {
            EventPayload::PullRequest(event) => event,
            EventPayload::Unsupported { kind } => {
                warn!(kind = %kind, "Forbidden hook type");
                return Disposition::UnexpectedKind { kind };
            }
        };

        if !self.config.policy.is_violation(&event) {
            debug!("[{}] PR #{} {}", event.base, event.number, event.action);
            return Disposition::Ignored;
        }

        info!(
            "[{}] PR #{} closed, {} => {}",
            event.base, event.number, event.head_branch, event.base_branch
        );
        let comment = self.config.comments.select();
        Disposition::ViolationLaunched(self.executor.launch(event.pull_request_ref(), comment))
    }
}
