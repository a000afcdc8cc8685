//! Shared value types for the nomaster domain.
//!
//! The event record handed from the event source to the dispatch loop, the
//! references used to address a pull request on the remote API, and the
//! outcomes of the remote actions taken against it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BranchName, DeliveryId, PullRequestNumber, RepositoryName, RepositoryOwner};

/// Event kind of the only webhook deliveries the policy acts on.
pub const PULL_REQUEST_EVENT_KIND: &str = "pull_request";

// ---------------------------------------------------------------------------
// Repository and pull request references
// ---------------------------------------------------------------------------

/// A repository on the remote code-hosting API, `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryRef {
    /// Owning user or organisation.
    pub owner: RepositoryOwner,
    /// Repository name.
    pub name: RepositoryName,
}

impl RepositoryRef {
    /// Creates a new [`RepositoryRef`].
    pub fn new(owner: RepositoryOwner, name: RepositoryName) -> Self {
        Self { owner, name }
    }
}

impl std::fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Everything needed to address one pull request on the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PullRequestRef {
    /// The repository the pull request merges into.
    pub repository: RepositoryRef,
    /// The pull request number within that repository.
    pub number: PullRequestNumber,
}

impl std::fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.repository, self.number)
    }
}

// ---------------------------------------------------------------------------
// Pull request events
// ---------------------------------------------------------------------------

/// The `action` field of a `pull_request` webhook.
///
/// GitHub keeps adding actions, so the set is open: anything not named here
/// is carried verbatim in [`PullRequestAction::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PullRequestAction {
    Opened,
    Reopened,
    Closed,
    Edited,
    Synchronize,
    Other(String),
}

impl PullRequestAction {
    /// Returns the wire representation of the action.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Opened => "opened",
            Self::Reopened => "reopened",
            Self::Closed => "closed",
            Self::Edited => "edited",
            Self::Synchronize => "synchronize",
            Self::Other(action) => action,
        }
    }
}

impl From<&str> for PullRequestAction {
    fn from(value: &str) -> Self {
        match value {
            "opened" => Self::Opened,
            "reopened" => Self::Reopened,
            "closed" => Self::Closed,
            "edited" => Self::Edited,
            "synchronize" => Self::Synchronize,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for PullRequestAction {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<PullRequestAction> for String {
    fn from(value: PullRequestAction) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for PullRequestAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalised `pull_request` webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestEvent {
    /// What happened to the pull request.
    pub action: PullRequestAction,
    /// The pull request number.
    pub number: PullRequestNumber,
    /// The repository that is the merge target.
    pub base: RepositoryRef,
    /// The branch the pull request targets.
    pub base_branch: BranchName,
    /// The branch the pull request comes from. Only used in log lines.
    pub head_branch: BranchName,
}

impl PullRequestEvent {
    /// Returns the reference used to act on this pull request.
    pub fn pull_request_ref(&self) -> PullRequestRef {
        PullRequestRef {
            repository: self.base.clone(),
            number: self.number,
        }
    }
}

/// The decoded body of a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    /// A `pull_request` delivery.
    PullRequest(PullRequestEvent),
    /// A delivery of any other kind; only its discriminator is kept.
    Unsupported {
        /// The `X-GitHub-Event` value, e.g. `"push"`.
        kind: String,
    },
}

/// One webhook delivery, as handed to the dispatch loop.
///
/// Records are never mutated after the event source creates them; the
/// dispatch loop takes ownership of each one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Delivery identifier, reused by GitHub on redelivery.
    pub delivery_id: DeliveryId,
    /// When the event source accepted the delivery.
    pub received_at: Timestamp,
    /// The decoded payload.
    pub payload: EventPayload,
}

impl EventRecord {
    /// Wraps a pull request event received now.
    pub fn pull_request(delivery_id: DeliveryId, event: PullRequestEvent) -> Self {
        Self {
            delivery_id,
            received_at: Timestamp::now(),
            payload: EventPayload::PullRequest(event),
        }
    }

    /// Wraps a delivery of a foreign kind received now.
    pub fn unsupported(delivery_id: DeliveryId, kind: impl Into<String>) -> Self {
        Self {
            delivery_id,
            received_at: Timestamp::now(),
            payload: EventPayload::Unsupported { kind: kind.into() },
        }
    }

    /// Returns the event kind discriminator.
    pub fn kind(&self) -> &str {
        match &self.payload {
            EventPayload::PullRequest(_) => PULL_REQUEST_EVENT_KIND,
            EventPayload::Unsupported { kind } => kind,
        }
    }
}

// ---------------------------------------------------------------------------
// Remote action outcomes
// ---------------------------------------------------------------------------

/// The remote mutations taken against a violating pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteAction {
    /// Transition the pull request to `closed`.
    Close,
    /// Post the explanatory comment.
    Comment,
}

impl std::fmt::Display for RemoteAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Close => f.write_str("close"),
            Self::Comment => f.write_str("comment"),
        }
    }
}

/// Final status of one remote mutation. Logged, never persisted or retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ActionOutcome {
    /// The API answered with the expected status.
    Succeeded {
        /// HTTP status code.
        status: u16,
    },
    /// The API answered, but not with the expected status.
    FailedWithStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, kept for diagnostics.
        body: String,
    },
    /// The request never produced a response (DNS, connect, timeout, ...).
    TransportError {
        /// Rendered transport error.
        message: String,
    },
}

impl ActionOutcome {
    /// Returns `true` for [`ActionOutcome::Succeeded`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Both outcomes of the corrective actions for one violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationReport {
    /// The pull request acted on.
    pub pull_request: PullRequestRef,
    /// Outcome of the close request.
    pub close: ActionOutcome,
    /// Outcome of the comment request.
    pub comment: ActionOutcome,
}

// ---------------------------------------------------------------------------
// Dispatch policy
// ---------------------------------------------------------------------------

/// What the dispatch loop does with a delivery of a kind it does not handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnexpectedEventPolicy {
    /// Stop serving. A foreign event kind ends the dispatch loop.
    #[default]
    Stop,
    /// Log the delivery and keep serving.
    Skip,
}

impl std::str::FromStr for UnexpectedEventPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "stop" => Ok(Self::Stop),
            "skip" => Ok(Self::Skip),
            other => Err(format!(
                "unknown unexpected-event policy '{other}' (expected 'stop' or 'skip')"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
