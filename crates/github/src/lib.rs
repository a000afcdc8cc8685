//! nomaster GitHub infrastructure adapter.
//!
//! Implements [`pipeline::PullRequestManager`] against the GitHub REST API
//! with `reqwest`:
//!
//! | Operation | Request | Expected status |
//! |-----------|---------|-----------------|
//! | close | `PATCH /repos/{owner}/{repo}/pulls/{number}` `{"state":"closed"}` | any 2xx |
//! | comment | `POST /repos/{owner}/{repo}/issues/{number}/comments` `{"body":"..."}` | `201 Created` |
//!
//! Every request carries a bearer token and the v3 media type in `Accept`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. Requests are
//! sent once; failures are logged here and returned as
//! [`pipeline::ActionOutcome`] values, never as errors.

use std::time::Duration;

use async_trait::async_trait;
use pipeline::{ActionOutcome, PullRequestManager, PullRequestRef, RemoteAction};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Public GitHub API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Media type selecting the v3 REST API.
pub const GITHUB_V3_MEDIA_TYPE: &str = "application/vnd.github.v3+json";

/// Settings for [`GithubClient`].
#[derive(Debug, Clone)]
pub struct GithubClientConfig {
    /// API root, e.g. [`DEFAULT_API_URL`] or a GitHub Enterprise `/api/v3` URL.
    pub api_url: String,
    /// Token sent as `Authorization: Bearer <token>`.
    pub token: String,
    /// Per-request timeout. `None` keeps the transport default.
    pub request_timeout: Option<Duration>,
}

/// Errors raised while building a [`GithubClient`].
#[derive(Debug, Error)]
pub enum GithubClientError {
    /// No token was supplied.
    #[error("GitHub token is empty")]
    MissingToken,

    /// The token cannot be sent as an HTTP header value.
    #[error("GitHub token contains characters that are not valid in a header")]
    InvalidToken,

    /// The underlying HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Serialize)]
struct UpdatePullRequest<'a> {
    state: &'a str,
}

#[derive(Serialize)]
struct CreateComment<'a> {
    body: &'a str,
}

/// GitHub REST client acting on pull requests.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
}

impl GithubClient {
    /// Builds a client with the authentication and media-type headers preset.
    pub fn new(config: GithubClientConfig) -> Result<Self, GithubClientError> {
        let token = config.token.trim();
        if token.is_empty() {
            return Err(GithubClientError::MissingToken);
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_V3_MEDIA_TYPE));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("nomaster/", env!("CARGO_PKG_VERSION"))),
        );
        let mut authorization = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| GithubClientError::InvalidToken)?;
        authorization.set_sensitive(true);
        headers.insert(AUTHORIZATION, authorization);

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn pull_request_url(&self, pull_request: &PullRequestRef) -> String {
        format!(
            "{}/repos/{}/{}/pulls/{}",
            self.api_url,
            pull_request.repository.owner,
            pull_request.repository.name,
            pull_request.number
        )
    }

    fn comments_url(&self, pull_request: &PullRequestRef) -> String {
        format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.api_url,
            pull_request.repository.owner,
            pull_request.repository.name,
            pull_request.number
        )
    }
}

#[async_trait]
impl PullRequestManager for GithubClient {
    async fn close_pull_request(&self, pull_request: &PullRequestRef) -> ActionOutcome {
        let url = self.pull_request_url(pull_request);
        debug!("PATCH {url} - Closing PR #{}", pull_request.number);

        let request = self
            .http
            .patch(&url)
            .json(&UpdatePullRequest { state: "closed" });
        finish(RemoteAction::Close, "PATCH", &url, request, |status| {
            status.is_success()
        })
        .await
    }

    async fn create_comment(&self, pull_request: &PullRequestRef, body: &str) -> ActionOutcome {
        let url = self.comments_url(pull_request);
        debug!("POST {url} - Commenting PR #{}", pull_request.number);

        let request = self.http.post(&url).json(&CreateComment { body });
        finish(RemoteAction::Comment, "POST", &url, request, |status| {
            status == StatusCode::CREATED
        })
        .await
    }
}

/// Sends `request` once and turns the result into an [`ActionOutcome`],
/// logging exactly one line for every failure.
async fn finish(
    action: RemoteAction,
    method: &str,
    url: &str,
    request: reqwest::RequestBuilder,
    expected: impl FnOnce(StatusCode) -> bool,
) -> ActionOutcome {
    let response = match request.send().await {
        Ok(response) => response,
        Err(err) => {
            error!(action = %action, "{method} {url} - request failed: {err}");
            return ActionOutcome::TransportError {
                message: err.to_string(),
            };
        }
    };

    let status = response.status();
    if expected(status) {
        return ActionOutcome::Succeeded {
            status: status.as_u16(),
        };
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|err| format!("<unreadable response body: {err}>"));
    warn!(
        action = %action,
        status = status.as_u16(),
        "{method} {url} - returned error code {status}: {body}"
    );
    ActionOutcome::FailedWithStatus {
        status: status.as_u16(),
        body,
    }
}
