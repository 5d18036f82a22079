//! Server-sent-events transport.
//!
//! Opens `POST {base}/api/v1/agents/{target}/chat/stream`, parses the SSE
//! body, and forwards each decoded [`StreamEvent`]. Payloads that do not
//! decode (event kinds outside the closed set, malformed JSON) are logged
//! and skipped; the stream itself keeps going.

use eventsource_stream::Eventsource;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use weft_core::events::{EventEnvelope, StreamEvent};
use weft_core::text::truncate_str;

use crate::transport::{Transport, TransportError, TurnRequest};

/// Max bytes of a bad payload echoed into the log.
const PAYLOAD_PREVIEW_BYTES: usize = 120;

/// SSE implementation of [`Transport`] over `reqwest`.
pub struct SseTransport {
    client: reqwest::Client,
    base_url: String,
}

impl SseTransport {
    /// Create a transport against `base_url` (no trailing slash).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Create a transport with a preconfigured client (timeouts, headers).
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn stream_url(&self, target: &str) -> String {
        format!("{}/api/v1/agents/{target}/chat/stream", self.base_url)
    }
}

#[async_trait::async_trait]
impl Transport for SseTransport {
    async fn open_stream(
        &self,
        target: &str,
        request: &TurnRequest,
        events: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    ) -> Result<(), TransportError> {
        let url = self.stream_url(target);
        debug!(%url, "opening turn stream");

        let response = tokio::select! {
            () = cancel.cancelled() => return Err(TransportError::Cancelled),
            resp = self.client.post(&url).json(request).send() => resp?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Protocol(format!(
                "stream request failed: {status}: {}",
                truncate_str(&body, PAYLOAD_PREVIEW_BYTES)
            )));
        }

        let mut stream = response.bytes_stream().eventsource();
        loop {
            let item = tokio::select! {
                () = cancel.cancelled() => return Err(TransportError::Cancelled),
                item = stream.next() => item,
            };
            let Some(item) = item else {
                // Remote closed without `done`; the orchestrator finalizes.
                return Ok(());
            };
            let sse = item.map_err(|err| TransportError::Protocol(err.to_string()))?;
            if sse.data.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<EventEnvelope>(&sse.data) {
                Ok(envelope) => {
                    let done = envelope.event.is_done();
                    if events.send(envelope.event).await.is_err() {
                        // Consumer gone; nothing left to deliver to.
                        return Ok(());
                    }
                    if done {
                        return Ok(());
                    }
                }
                Err(err) => {
                    warn!(
                        %err,
                        payload = truncate_str(&sse.data, PAYLOAD_PREVIEW_BYTES),
                        "skipping undecodable stream event"
                    );
                }
            }
        }
    }
}
