//! Core domain for nomaster.
//!
//! nomaster closes pull requests opened against a protected branch and posts
//! a comment explaining why. This crate holds every domain concept that
//! decision needs: the event record, the policy, comment selection, the
//! outcome types, and the port traits infrastructure crates implement.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`PullRequestNumber`, `BranchName`, etc.) |
//! | [`types`] | Event record, references, action outcomes, dispatch policy |
//! | [`policy`] | The protected-branch [`PolicyEvaluator`] |
//! | [`comments`] | [`CommentPool`] and [`CommentSelector`] |
//! | [`ports`] | [`EventSource`] and [`PullRequestManager`] traits |
//! | [`errors`] | Startup error type |

pub mod comments;
pub mod errors;
pub mod identifiers;
pub mod policy;
pub mod ports;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use comments::{
    CommentPool, CommentSelector, DEFAULT_TEMPLATES, DEFAULT_THEMES, THEME_PLACEHOLDER,
};
pub use errors::NomasterError;
pub use identifiers::{BranchName, DeliveryId, PullRequestNumber, RepositoryName, RepositoryOwner};
pub use policy::{PolicyEvaluator, DEFAULT_PROTECTED_BRANCH};
pub use ports::{EventSource, PullRequestManager};
pub use types::{
    ActionOutcome, EventPayload, EventRecord, PullRequestAction, PullRequestEvent,
    PullRequestRef, RemoteAction, RepositoryRef, Timestamp, UnexpectedEventPolicy,
    ViolationReport, PULL_REQUEST_EVENT_KIND,
};
