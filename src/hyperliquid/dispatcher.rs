//! Rate-limited request dispatcher for the info endpoint
//!
//! All queries funnel through a single FIFO queue drained by one background
//! task, so at most one request is in flight at any time and total throughput
//! stays under the exchange's rate limit. A 429 puts the in-flight request
//! back at the head of the queue and pauses the whole dispatcher; any other
//! failure resolves that request to `None` and the queue moves on.

use reqwest::{Client, StatusCode};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use super::messages::InfoRequest;
use crate::common::errors::{ClientError, Result};
use crate::config::types::HyperliquidConfig;

/// A request waiting in the dispatcher queue
struct QueuedRequest {
    body: serde_json::Value,
    reply: oneshot::Sender<Option<serde_json::Value>>,
}

/// Outcome of one POST attempt
enum Attempt {
    Ok(serde_json::Value),
    RateLimited,
    Failed(String),
}

/// Handle to the dispatcher task; cheap to clone
#[derive(Debug, Clone)]
pub struct RequestDispatcher {
    tx: mpsc::UnboundedSender<QueuedRequest>,
}

impl RequestDispatcher {
    /// Spawn the dispatcher task for the configured info endpoint
    pub fn new(config: &HyperliquidConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Internal(e.to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(run_queue(
            client,
            config.api_url.clone(),
            Duration::from_millis(config.request_spacing_ms),
            Duration::from_millis(config.rate_limit_pause_ms),
            rx,
        ));

        Ok(Self { tx })
    }

    /// Queue an info request and wait for its result
    ///
    /// Resolves to `None` on any terminal failure; callers treat that as
    /// "no data this cycle", never as a crash condition.
    pub async fn enqueue(&self, request: &InfoRequest) -> Option<serde_json::Value> {
        let body = match serde_json::to_value(request) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to serialize info request: {}", e);
                return None;
            }
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .tx
            .send(QueuedRequest {
                body,
                reply: reply_tx,
            })
            .is_err()
        {
            error!("Dispatcher task is gone; dropping request");
            return None;
        }

        reply_rx.await.unwrap_or(None)
    }
}

/// Queue owner: drains one request at a time with fixed spacing
async fn run_queue(
    client: Client,
    api_url: String,
    spacing: Duration,
    rate_limit_pause: Duration,
    mut rx: mpsc::UnboundedReceiver<QueuedRequest>,
) {
    let mut queue: VecDeque<QueuedRequest> = VecDeque::new();

    loop {
        // Pull everything already waiting so a front-requeue keeps its place
        // ahead of later arrivals
        while let Ok(req) = rx.try_recv() {
            queue.push_back(req);
        }

        let req = match queue.pop_front() {
            Some(req) => req,
            None => match rx.recv().await {
                Some(req) => req,
                None => break,
            },
        };

        match post_once(&client, &api_url, &req.body).await {
            Attempt::Ok(value) => {
                let _ = req.reply.send(Some(value));
                // Spacing between successful calls keeps us under the limit
                tokio::time::sleep(spacing).await;
            }
            Attempt::RateLimited => {
                warn!(
                    pause_ms = rate_limit_pause.as_millis() as u64,
                    "Rate limited (429), requeueing at head and pausing"
                );
                queue.push_front(req);
                tokio::time::sleep(rate_limit_pause).await;
            }
            Attempt::Failed(reason) => {
                warn!("Info request failed, resolving to no data: {}", reason);
                let _ = req.reply.send(None);
            }
        }
    }

    debug!("Dispatcher queue closed");
}

async fn post_once(client: &Client, api_url: &str, body: &serde_json::Value) -> Attempt {
    let response = match client.post(api_url).json(body).send().await {
        Ok(response) => response,
        Err(e) => return Attempt::Failed(e.to_string()),
    };

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Attempt::RateLimited;
    }
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Attempt::Failed(format!("status {status}: {text}"));
    }

    match response.json::<serde_json::Value>().await {
        Ok(value) => Attempt::Ok(value),
        Err(e) => Attempt::Failed(format!("body decode: {e}")),
    }
}
