//! The protected-branch policy.
//!
//! A pull request violates the policy when it is opened (or reopened) with
//! the protected branch as its merge target. The evaluator only accepts
//! [`PullRequestEvent`]s, so deliveries of any other kind are rejected before
//! they can be classified.

use crate::{BranchName, PullRequestAction, PullRequestEvent};

/// Branch that pull requests must not target unless configured otherwise.
pub const DEFAULT_PROTECTED_BRANCH: &str = "master";

/// Decides whether a pull request event denotes a forbidden state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEvaluator {
    protected_branch: BranchName,
}

impl PolicyEvaluator {
    /// Creates an evaluator protecting `protected_branch`.
    pub fn new(protected_branch: BranchName) -> Self {
        Self { protected_branch }
    }

    /// Returns the branch this evaluator protects.
    pub fn protected_branch(&self) -> &BranchName {
        &self.protected_branch
    }

    /// Returns `true` if the event opens or reopens a pull request against
    /// the protected branch.
    pub fn is_violation(&self, event: &PullRequestEvent) -> bool {
        matches!(
            event.action,
            PullRequestAction::Opened | PullRequestAction::Reopened
        ) && event.base_branch == self.protected_branch
    }
}

impl Default for PolicyEvaluator {
    fn default() -> Self {
        Self {
            protected_branch: BranchName::from_static(DEFAULT_PROTECTED_BRANCH),
        }
    }
}
