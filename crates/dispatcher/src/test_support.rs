//! In-memory doubles for the pipeline ports.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use pipeline::{
    ActionOutcome, BranchName, DeliveryId, EventRecord, EventSource, PullRequestAction,
    PullRequestEvent, PullRequestManager, PullRequestNumber, PullRequestRef, RepositoryName,
    RepositoryOwner, RepositoryRef,
};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Close(PullRequestRef),
    Comment(PullRequestRef, String),
}

/// Records every call in initiation order and answers with fixed outcomes.
pub(crate) struct RecordingManager {
    calls: Mutex<Vec<Call>>,
    notify: Mutex<Option<mpsc::UnboundedSender<Call>>>,
    close_outcome: ActionOutcome,
    comment_outcome: ActionOutcome,
}

impl Default for RecordingManager {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            notify: Mutex::new(None),
            close_outcome: ActionOutcome::Succeeded { status: 200 },
            comment_outcome: ActionOutcome::Succeeded { status: 201 },
        }
    }
}

impl RecordingManager {
    pub(crate) fn failing_close() -> Self {
        Self {
            close_outcome: ActionOutcome::TransportError {
                message: "connection refused".to_string(),
            },
            ..Self::default()
        }
    }

    pub(crate) fn failing_comment() -> Self {
        Self {
            comment_outcome: ActionOutcome::FailedWithStatus {
                status: 403,
                body: "forbidden".to_string(),
            },
            ..Self::default()
        }
    }

    /// Returns a receiver that yields every call as it is recorded.
    pub(crate) fn subscribe(&self) -> mpsc::UnboundedReceiver<Call> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.notify.lock().expect("notify lock") = Some(tx);
        rx
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("calls lock").push(call.clone());
        if let Some(tx) = self.notify.lock().expect("notify lock").as_ref() {
            let _ = tx.send(call);
        }
    }
}

#[async_trait]
impl PullRequestManager for RecordingManager {
    async fn close_pull_request(&self, pull_request: &PullRequestRef) -> ActionOutcome {
        self.record(Call::Close(pull_request.clone()));
        self.close_outcome.clone()
    }

    async fn create_comment(&self, pull_request: &PullRequestRef, body: &str) -> ActionOutcome {
        self.record(Call::Comment(pull_request.clone(), body.to_string()));
        self.comment_outcome.clone()
    }
}

/// A pre-filled source that closes once drained.
#[derive(Default)]
pub(crate) struct QueueSource {
    pub(crate) records: VecDeque<EventRecord>,
}

impl QueueSource {
    pub(crate) fn new(records: impl IntoIterator<Item = EventRecord>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }
}

#[async_trait]
impl EventSource for QueueSource {
    async fn next_event(&mut self) -> Option<EventRecord> {
        self.records.pop_front()
    }
}

pub(crate) fn pull_request_ref(owner: &str, repo: &str, number: u64) -> PullRequestRef {
    PullRequestRef {
        repository: RepositoryRef::new(
            RepositoryOwner::new(owner).expect("owner"),
            RepositoryName::new(repo).expect("repo"),
        ),
        number: PullRequestNumber::new(number),
    }
}

pub(crate) fn pull_request_record(action: &str, base_branch: &str, number: u64) -> EventRecord {
    EventRecord::pull_request(
        DeliveryId::new_random(),
        PullRequestEvent {
            action: PullRequestAction::from(action),
            number: PullRequestNumber::new(number),
            base: RepositoryRef::new(
                RepositoryOwner::new("acme").expect("owner"),
                RepositoryName::new("widgets").expect("repo"),
            ),
            base_branch: BranchName::new(base_branch).expect("base"),
            head_branch: BranchName::new("feature/gears").expect("head"),
        },
    )
}
