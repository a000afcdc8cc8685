//! Decoding of `pull_request` webhook bodies.
//!
//! Only the handful of fields the policy and the log lines need are read;
//! everything else in GitHub's payload is ignored.

use pipeline::{
    BranchName, PullRequestAction, PullRequestEvent, PullRequestNumber, RepositoryName,
    RepositoryOwner, RepositoryRef,
};
use serde::Deserialize;
use thiserror::Error;

/// Reasons a `pull_request` body cannot become an event record.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The body is not JSON of the expected shape.
    #[error("Malformed pull_request payload: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field is present but empty or null.
    #[error("pull_request payload is missing {0}")]
    Missing(&'static str),
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    action: String,
    number: u64,
    pull_request: PullRequestBody,
}

#[derive(Debug, Deserialize)]
struct PullRequestBody {
    head: BranchBody,
    base: BranchBody,
}

#[derive(Debug, Deserialize)]
struct BranchBody {
    #[serde(rename = "ref")]
    branch: String,
    // `head.repo` is null once a fork has been deleted.
    repo: Option<RepositoryBody>,
}

#[derive(Debug, Deserialize)]
struct RepositoryBody {
    name: String,
    owner: OwnerBody,
}

#[derive(Debug, Deserialize)]
struct OwnerBody {
    login: String,
}

/// Decodes a `pull_request` webhook body.
pub fn decode_pull_request(body: &[u8]) -> Result<PullRequestEvent, PayloadError> {
    let payload: PullRequestPayload = serde_json::from_slice(body)?;
    let base_repo = payload
        .pull_request
        .base
        .repo
        .ok_or(PayloadError::Missing("pull_request.base.repo"))?;

    Ok(PullRequestEvent {
        action: PullRequestAction::from(payload.action),
        number: PullRequestNumber::new(payload.number),
        base: RepositoryRef::new(
            RepositoryOwner::new(base_repo.owner.login)
                .ok_or(PayloadError::Missing("pull_request.base.repo.owner.login"))?,
            RepositoryName::new(base_repo.name)
                .ok_or(PayloadError::Missing("pull_request.base.repo.name"))?,
        ),
        base_branch: BranchName::new(payload.pull_request.base.branch)
            .ok_or(PayloadError::Missing("pull_request.base.ref"))?,
        head_branch: BranchName::new(payload.pull_request.head.branch)
            .ok_or(PayloadError::Missing("pull_request.head.ref"))?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::{json, Value};

    use super::*;

    pub(crate) fn pull_request_body(action: &str, base_branch: &str) -> Value {
        json!({
            "action": action,
            "number": 42,
            "pull_request": {
                "number": 42,
                "state": "open",
                "head": {
                    "ref": "feature/gears",
                    "repo": null
                },
                "base": {
                    "ref": base_branch,
                    "repo": {
                        "name": "widgets",
                        "full_name": "acme/widgets",
                        "owner": { "login": "acme" }
                    }
                }
            },
            "repository": { "name": "widgets", "owner": { "login": "acme" } }
        })
    }

    #[test]
    fn decodes_the_fields_the_policy_needs() {
        let body = serde_json::to_vec(&pull_request_body("opened", "master")).expect("json");

        let event = decode_pull_request(&body).expect("event");

        assert_eq!(event.action, PullRequestAction::Opened);
        assert_eq!(event.number.as_u64(), 42);
        assert_eq!(event.base.to_string(), "acme/widgets");
        assert_eq!(event.base_branch.as_str(), "master");
        assert_eq!(event.head_branch.as_str(), "feature/gears");
    }

    #[test]
    fn rejects_bodies_without_a_base_repository() {
        let mut body = pull_request_body("opened", "master");
        body["pull_request"]["base"]["repo"] = Value::Null;
        let body = serde_json::to_vec(&body).expect("json");

        assert!(matches!(
            decode_pull_request(&body),
            Err(PayloadError::Missing("pull_request.base.repo"))
        ));
    }

    #[test]
    fn rejects_non_json_bodies() {
        assert!(matches!(
            decode_pull_request(b"payload=%7B%7D"),
            Err(PayloadError::Json(_))
        ));
    }
}
