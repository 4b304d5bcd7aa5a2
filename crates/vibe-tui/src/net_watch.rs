//! Connectivity watcher — the terminal-side stand-in for browser
//! online/offline events.
//!
//! Probes the server's `/healthz` on a fixed cadence and reports only the
//! edges: one `Offline` when the server stops answering, one `Online`
//! when it answers again.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::app::AppMessage;
use crate::reconciler::NetSignal;

pub fn spawn(
    client: reqwest::Client,
    healthz_url: String,
    interval: Duration,
    out: mpsc::Sender<AppMessage>,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut last_up: Option<bool> = None;

        loop {
            ticker.tick().await;
            let up = probe(&client, &healthz_url).await;
            if last_up == Some(up) {
                continue;
            }
            // Startup while reachable is not an edge.
            let first = last_up.is_none();
            last_up = Some(up);
            if first && up {
                continue;
            }

            let signal = if up {
                NetSignal::Online
            } else {
                NetSignal::Offline
            };
            debug!("connectivity edge: {:?}", signal);
            if out.send(AppMessage::Net(signal)).await.is_err() {
                break;
            }
        }
    });
}

async fn probe(client: &reqwest::Client, url: &str) -> bool {
    match client
        .get(url)
        .timeout(Duration::from_secs(2))
        .send()
        .await
    {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}
