//! Status poller — one request to `/nowplaying` per request message.
//!
//! The poller task owns the HTTP client loop and performs at most one
//! request at a time.  Poll requests arriving while a response is pending
//! are dropped, not queued, so UI updates can never arrive out of order.
//! Failures are classified by origin (transport vs. HTTP status vs.
//! payload), never by inspecting message text.

use tokio::sync::mpsc;
use tracing::debug;

use vibe_proto::snapshot::{ErrorBody, PlaybackSnapshot};

use crate::app::AppMessage;

/// Result of a single poll, already classified for the reconciler.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Snapshot(PlaybackSnapshot),
    /// HTTP 401 — session missing or expired.  Not a network error and
    /// never consumes a retry attempt.
    Unauthorized,
    /// Non-401 HTTP error, or a 2xx body carrying an `error` field.
    /// Not assumed transient; surfaced without automatic retry.
    Upstream(String),
    /// Transport failure — no HTTP response at all.
    Network,
    /// 2xx body that does not deserialize into a snapshot.
    Malformed,
}

/// Handle for requesting polls.  Cheap to clone.
#[derive(Clone)]
pub struct PollerHandle {
    tx: mpsc::Sender<()>,
}

impl PollerHandle {
    /// Request a poll.  Dropped silently when one is already in flight.
    pub fn poll_now(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Spawn the poller task.  Each received request performs one poll and
/// reports the outcome on the app event bus.  The task exits when the
/// handle and the app channel are dropped.
pub fn spawn(
    client: reqwest::Client,
    nowplaying_url: String,
    out: mpsc::Sender<AppMessage>,
) -> PollerHandle {
    let (tx, mut rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            let outcome = poll_once(&client, &nowplaying_url).await;
            debug!("poll outcome: {:?}", outcome);
            if out.send(AppMessage::Poll(outcome)).await.is_err() {
                break;
            }
        }
    });
    PollerHandle { tx }
}

async fn poll_once(client: &reqwest::Client, url: &str) -> PollOutcome {
    let response = match client.get(url).send().await {
        Ok(r) => r,
        // No response at all: transport failure, regardless of the
        // error message.
        Err(_) => return PollOutcome::Network,
    };

    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return PollOutcome::Unauthorized;
    }
    if !status.is_success() {
        // Forward the status text; include the server's error kind when
        // the body is parseable.
        let kind = response
            .json::<ErrorBody>()
            .await
            .ok()
            .map(|b| b.error.to_string());
        return match kind {
            Some(kind) => PollOutcome::Upstream(format!("server error {status} ({kind})")),
            None => PollOutcome::Upstream(format!("server error {status}")),
        };
    }

    let body: serde_json::Value = match response.json().await {
        Ok(v) => v,
        Err(_) => return PollOutcome::Malformed,
    };
    outcome_from_body(body)
}

/// Classify a 2xx response body.  A body carrying an `error` field is
/// routed to the error path even though the request "succeeded".
fn outcome_from_body(body: serde_json::Value) -> PollOutcome {
    if let Some(err) = body.get("error") {
        let kind = err.as_str().unwrap_or("unknown").to_string();
        return PollOutcome::Upstream(format!("server reported error ({kind})"));
    }
    match serde_json::from_value::<PlaybackSnapshot>(body) {
        Ok(snapshot) => PollOutcome::Snapshot(snapshot),
        Err(_) => PollOutcome::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_body_is_snapshot() {
        let body = json!({
            "isPlaying": true,
            "title": "A",
            "artist": "B",
            "coverUrl": null,
            "deviceName": "Desk",
            "progressMs": 1000,
            "durationMs": 2000
        });
        match outcome_from_body(body) {
            PollOutcome::Snapshot(s) => {
                assert!(s.is_playing);
                assert_eq!(s.title.as_deref(), Some("A"));
            }
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    #[test]
    fn test_error_field_routes_to_error_path() {
        let body = json!({ "error": "upstream" });
        match outcome_from_body(body) {
            PollOutcome::Upstream(msg) => assert!(msg.contains("upstream")),
            other => panic!("expected upstream, got {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_body_is_malformed() {
        let body = json!({ "isPlaying": "not-a-bool" });
        assert!(matches!(outcome_from_body(body), PollOutcome::Malformed));
    }
}
