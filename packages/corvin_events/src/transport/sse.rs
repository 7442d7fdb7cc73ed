//! SSE Transport
//!
//! `text/event-stream` connector over reqwest. Each `open` spawns one reader
//! task that streams the response body, reassembles event frames across
//! chunk boundaries, and forwards each complete data payload to the
//! subscription.

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{Connection, Connector, TransportError, TransportEvent};

/// Channel capacity between a reader task and the subscription.
const EVENT_BUFFER: usize = 64;

/// Server-sent-events connector.
pub struct SseConnector {
    client: reqwest::Client,
}

impl SseConnector {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured client (proxies, timeouts, default headers).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for SseConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for SseConnector {
    fn open(&self, endpoint: &str) -> Connection {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();
        let id = uuid::Uuid::new_v4().to_string();

        let reader_cancel = cancel.clone();
        let client = self.client.clone();
        let url = endpoint.to_string();
        let conn_id = id.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = reader_cancel.cancelled() => {
                    debug!(connection = %conn_id, "reader cancelled");
                }
                _ = run_reader(client, url, tx, conn_id.clone()) => {}
            }
        });

        Connection::new(id, rx, cancel)
    }
}

async fn run_reader(
    client: reqwest::Client,
    url: String,
    tx: mpsc::Sender<TransportEvent>,
    conn_id: String,
) {
    let response = match client
        .get(&url)
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!(connection = %conn_id, url = %url, "connect failed: {}", e);
            let _ = tx
                .send(TransportEvent::Error(TransportError::Connect {
                    reason: e.to_string(),
                }))
                .await;
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        warn!(connection = %conn_id, url = %url, status = %status, "endpoint rejected stream request");
        let _ = tx
            .send(TransportEvent::Error(TransportError::Status {
                status: status.as_u16(),
            }))
            .await;
        return;
    }

    debug!(connection = %conn_id, url = %url, "stream open");

    let mut body = response.bytes_stream();
    let mut decoder = SseFrameDecoder::new();
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => {
                for payload in decoder.feed(&bytes) {
                    if tx.send(TransportEvent::Message(payload)).await.is_err() {
                        // Subscription closed the connection.
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(connection = %conn_id, "stream read failed: {}", e);
                let _ = tx
                    .send(TransportEvent::Error(TransportError::Read {
                        reason: e.to_string(),
                    }))
                    .await;
                return;
            }
        }
    }

    debug!(connection = %conn_id, "server ended stream");
    let _ = tx
        .send(TransportEvent::Error(TransportError::Closed))
        .await;
}

/// Incremental `text/event-stream` frame decoder.
///
/// Network chunks may split lines, frames, and multi-byte UTF-8 sequences at
/// arbitrary boundaries; incomplete input is buffered across calls. Only
/// `data` fields are kept; `event:`, `id:`, `retry:` and `:` comment lines
/// are skipped. A blank line dispatches the accumulated payload, with
/// multiple data lines joined by `\n`.
#[derive(Default)]
pub struct SseFrameDecoder {
    buf: Vec<u8>,
    data: Vec<String>,
}

impl SseFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes and return the payloads of any frames it
    /// completed. A trailing partial line is retained for the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if let Some(payload) = self.take_line(&line) {
                out.push(payload);
            }
        }
        out
    }

    fn take_line(&mut self, line: &[u8]) -> Option<String> {
        if line.is_empty() {
            // Frame boundary: dispatch if any data accumulated.
            if self.data.is_empty() {
                return None;
            }
            return Some(self.data.drain(..).collect::<Vec<_>>().join("\n"));
        }

        let text = String::from_utf8_lossy(line);
        if let Some(rest) = text.strip_prefix("data:") {
            self.data
                .push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        } else if text == "data" {
            // Field name with no colon carries an empty value.
            self.data.push(String::new());
        }
        None
    }
}
