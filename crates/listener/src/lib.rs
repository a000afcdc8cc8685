//! nomaster webhook event source.
//!
//! Implements [`pipeline::EventSource`] with an HTTP server that receives
//! GitHub webhook deliveries directly:
//!
//! | Route | Behaviour |
//! |-------|-----------|
//! | `POST {path}` | verify signature, decode, enqueue, `202 Accepted` |
//! | `GET {healthcheck}` | `200 OK` |
//!
//! When a secret is configured every delivery must carry a valid
//! `X-Hub-Signature-256`; unsigned or mis-signed deliveries never reach the
//! queue. `ping` deliveries are acknowledged and dropped. `pull_request`
//! deliveries are decoded into [`pipeline::PullRequestEvent`]s; any other
//! kind is enqueued as [`pipeline::EventPayload::Unsupported`] and left to
//! the dispatcher's policy.
//!
//! The queue is an unbounded FIFO channel. The acknowledgement sent to GitHub
//! only says the delivery was queued, not that any action succeeded.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Transport details and payload deserialisation live
//! here. The [`pipeline`] crate sees only [`pipeline::EventSource`] and
//! [`pipeline::EventRecord`].

pub mod payload;
pub mod signature;

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pipeline::{DeliveryId, EventRecord, EventSource, PULL_REQUEST_EVENT_KIND};
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use payload::{decode_pull_request, PayloadError};
pub use signature::{verify_signature, SignatureError, SIGNATURE_HEADER};

/// Header naming the webhook event kind.
pub const EVENT_HEADER: &str = "x-github-event";

/// Header carrying the delivery GUID.
pub const DELIVERY_HEADER: &str = "x-github-delivery";

/// Settings for the webhook listener.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Interface to bind, e.g. `0.0.0.0`.
    pub host: String,
    /// TCP port to bind; `0` picks a free port.
    pub port: u16,
    /// Route receiving webhook deliveries.
    pub path: String,
    /// Route answering health checks.
    pub healthcheck: String,
    /// Shared webhook secret. `None` disables signature verification.
    pub secret: Option<String>,
}

/// Errors raised while starting or running the listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The listening socket could not be bound.
    #[error("Failed to bind webhook listener on {addr}: {source}")]
    Bind {
        /// Requested `host:port`.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O error.
    #[error("Webhook listener failed: {0}")]
    Serve(#[from] std::io::Error),

    /// The server task panicked or was aborted.
    #[error("Webhook listener task ended abnormally: {0}")]
    Task(#[from] tokio::task::JoinError),
}

struct ListenerState {
    secret: Option<String>,
    queue: mpsc::UnboundedSender<EventRecord>,
}

/// Receiving end of the webhook queue.
#[derive(Debug)]
pub struct WebhookEventSource {
    receiver: mpsc::UnboundedReceiver<EventRecord>,
}

#[async_trait]
impl EventSource for WebhookEventSource {
    async fn next_event(&mut self) -> Option<EventRecord> {
        self.receiver.recv().await
    }
}

/// Handle on the running server task.
#[derive(Debug)]
pub struct ListenerHandle {
    local_addr: SocketAddr,
    task: JoinHandle<std::io::Result<()>>,
}

impl ListenerHandle {
    /// Returns the address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops the server. Queued records stay readable from the source.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Waits for the server task to end.
    pub async fn finish(self) -> Result<(), ListenerError> {
        self.task.await??;
        Ok(())
    }
}

/// The webhook listener.
pub struct WebhookListener;

impl WebhookListener {
    /// Binds the socket and starts serving on a spawned task.
    pub async fn bind(
        config: ListenerConfig,
    ) -> Result<(WebhookEventSource, ListenerHandle), ListenerError> {
        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(addr.as_str())
            .await
            .map_err(|source| ListenerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenerError::Bind {
                addr: addr.clone(),
                source,
            })?;

        let (source, router) = Self::router(&config);
        info!(
            addr = %local_addr,
            path = %config.path,
            healthcheck = %config.healthcheck,
            signed = config.secret.as_deref().is_some_and(|secret| !secret.is_empty()),
            "Webhook listener bound"
        );
        let task = tokio::spawn(async move { axum::serve(listener, router).await });

        Ok((source, ListenerHandle { local_addr, task }))
    }

    /// Builds the router and the queue it feeds, without binding a socket.
    pub fn router(config: &ListenerConfig) -> (WebhookEventSource, Router) {
        let (queue, receiver) = mpsc::unbounded_channel();
        let state = Arc::new(ListenerState {
            secret: config.secret.clone().filter(|secret| !secret.is_empty()),
            queue,
        });
        let router = Router::new()
            .route(&config.path, post(handle_webhook))
            .route(&config.healthcheck, get(handle_health))
            .with_state(state);
        (WebhookEventSource { receiver }, router)
    }
}

async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

fn rejection(status: StatusCode, code: &str, message: String) -> Response {
    (
        status,
        Json(json!({"error": {"code": code, "message": message}})),
    )
        .into_response()
}

async fn handle_webhook(
    State(state): State<Arc<ListenerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = state.secret.as_deref() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok());
        if let Err(err) = verify_signature(&body, signature, secret) {
            warn!(error = %err, "Rejected webhook delivery with invalid signature");
            return rejection(StatusCode::UNAUTHORIZED, "invalid_signature", err.to_string());
        }
    }

    let Some(kind) = headers
        .get(EVENT_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        return rejection(
            StatusCode::BAD_REQUEST,
            "missing_event",
            "missing X-GitHub-Event header".to_string(),
        );
    };

    let delivery_id = headers
        .get(DELIVERY_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(DeliveryId::parse)
        .unwrap_or_else(DeliveryId::new_random);

    if kind == "ping" {
        debug!(delivery = %delivery_id, "Webhook ping");
        return (StatusCode::OK, Json(json!({"status": "pong"}))).into_response();
    }

    let record = if kind == PULL_REQUEST_EVENT_KIND {
        match decode_pull_request(&body) {
            Ok(event) => EventRecord::pull_request(delivery_id, event),
            Err(err) => {
                warn!(delivery = %delivery_id, error = %err, "Rejected undecodable pull_request delivery");
                return rejection(StatusCode::BAD_REQUEST, "invalid_payload", err.to_string());
            }
        }
    } else {
        EventRecord::unsupported(delivery_id, kind)
    };

    debug!(delivery = %delivery_id, kind = record.kind(), "Webhook delivery queued");
    if state.queue.send(record).is_err() {
        warn!(delivery = %delivery_id, "Dispatch loop has stopped; delivery dropped");
        return rejection(
            StatusCode::SERVICE_UNAVAILABLE,
            "not_serving",
            "event queue is closed".to_string(),
        );
    }

    (
        StatusCode::ACCEPTED,
        Json(json!({"status": "accepted", "delivery": delivery_id.to_string()})),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use pipeline::{EventPayload, PullRequestAction};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::payload::tests::pull_request_body;
    use crate::signature::tests::sign;

    fn config(secret: Option<&str>) -> ListenerConfig {
        ListenerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            path: "/".to_string(),
            healthcheck: "/ping".to_string(),
            secret: secret.map(str::to_string),
        }
    }

    fn delivery(kind: &str, body: &[u8], signature: Option<String>) -> Request<Body> {
        let mut request = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .header(EVENT_HEADER, kind)
            .header(DELIVERY_HEADER, "72d3162e-cc78-11e3-81ab-4c9367dc0958");
        if let Some(signature) = signature {
            request = request.header(SIGNATURE_HEADER, signature);
        }
        request.body(Body::from(body.to_vec())).expect("request")
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        serde_json::from_slice(&bytes).expect("json response")
    }

    #[tokio::test]
    async fn signed_pull_request_is_queued() {
        let (mut source, router) = WebhookListener::router(&config(Some("s3cret")));
        let body = serde_json::to_vec(&pull_request_body("opened", "master")).expect("json");

        let response = router
            .oneshot(delivery("pull_request", &body, Some(sign(&body, "s3cret"))))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            json_body(response).await["delivery"],
            "72d3162e-cc78-11e3-81ab-4c9367dc0958"
        );
        let record = source.next_event().await.expect("record");
        assert_eq!(record.kind(), "pull_request");
        match record.payload {
            EventPayload::PullRequest(event) => {
                assert_eq!(event.action, PullRequestAction::Opened);
                assert_eq!(event.number.as_u64(), 42);
            }
            other => panic!("expected a pull request, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_signature_never_reaches_the_queue() {
        let (mut source, router) = WebhookListener::router(&config(Some("s3cret")));
        let body = serde_json::to_vec(&pull_request_body("opened", "master")).expect("json");

        let response = router
            .oneshot(delivery("pull_request", &body, Some(sign(&body, "wrong"))))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"]["code"], "invalid_signature");
        assert!(source.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsigned_delivery_is_rejected_when_secret_is_set() {
        let (_source, router) = WebhookListener::router(&config(Some("s3cret")));
        let body = serde_json::to_vec(&pull_request_body("opened", "master")).expect("json");

        let response = router
            .oneshot(delivery("pull_request", &body, None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unsigned_delivery_is_accepted_without_secret() {
        let (mut source, router) = WebhookListener::router(&config(None));
        let body = serde_json::to_vec(&pull_request_body("closed", "develop")).expect("json");

        let response = router
            .oneshot(delivery("pull_request", &body, None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(source.next_event().await.is_some());
    }

    #[tokio::test]
    async fn foreign_kinds_are_queued_as_unsupported() {
        let (mut source, router) = WebhookListener::router(&config(None));

        let response = router
            .oneshot(delivery("push", b"{\"ref\":\"refs/heads/master\"}", None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let record = source.next_event().await.expect("record");
        assert_eq!(
            record.payload,
            EventPayload::Unsupported {
                kind: "push".to_string()
            }
        );
    }

    #[tokio::test]
    async fn ping_is_acknowledged_without_queueing() {
        let (mut source, router) = WebhookListener::router(&config(None));

        let response = router
            .oneshot(delivery("ping", b"{\"zen\":\"Keep it logically awesome.\"}", None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(source.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn malformed_pull_request_is_rejected() {
        let (mut source, router) = WebhookListener::router(&config(None));

        let response = router
            .oneshot(delivery("pull_request", b"{\"action\":\"opened\"}", None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "invalid_payload");
        assert!(source.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn missing_event_header_is_rejected() {
        let (_source, router) = WebhookListener::router(&config(None));
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from("{}"))
            .expect("request");

        let response = router.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn healthcheck_answers_ok() {
        let (_source, router) = WebhookListener::router(&config(None));
        let request = Request::builder()
            .method("GET")
            .uri("/ping")
            .body(Body::empty())
            .expect("request");

        let response = router.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn deliveries_are_queued_in_arrival_order() {
        let (mut source, router) = WebhookListener::router(&config(None));

        for kind in ["push", "release", "issues"] {
            let response = router
                .clone()
                .oneshot(delivery(kind, b"{}", None))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::ACCEPTED);
        }

        for kind in ["push", "release", "issues"] {
            assert_eq!(source.next_event().await.expect("record").kind(), kind);
        }
    }

    #[tokio::test]
    async fn bind_failure_is_reported_as_a_bind_error() {
        let taken = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = taken.local_addr().expect("addr").port();
        let mut config = config(None);
        config.port = port;

        let result = WebhookListener::bind(config).await;

        match result {
            Err(ListenerError::Bind { addr, .. }) => assert_eq!(addr, format!("127.0.0.1:{port}")),
            other => panic!("expected a bind error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bind_reports_the_chosen_port() {
        let (_source, handle) = WebhookListener::bind(config(None)).await.expect("bind");

        assert_ne!(handle.local_addr().port(), 0);
        handle.abort();
        assert!(matches!(handle.finish().await, Err(ListenerError::Task(_))));
    }
}
