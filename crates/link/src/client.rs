use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::config::LinkConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("invalid endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("timed out connecting to {0}")]
    Timeout(String),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// One text frame, undecoded.
    Frame(String),
    /// The remote side closed or the transport failed. Nothing follows.
    Closed,
}

/// Receive-only connection to a telemetry source.
///
/// The socket is read by one spawned task that forwards text frames over a
/// channel. `close` releases the socket; dropping the link without calling
/// `close` signals the reader to release it as well. There is no reconnect.
pub struct TelemetryLink {
    endpoint: String,
    events_rx: mpsc::Receiver<LinkEvent>,
    shutdown: Option<oneshot::Sender<()>>,
    reader: Option<JoinHandle<()>>,
    closed: bool,
}

impl TelemetryLink {
    pub async fn open(config: &LinkConfig) -> Result<Self, LinkError> {
        let url = config.endpoint_url()?;
        let endpoint = url.to_string();
        debug!(%endpoint, client_id = %config.client_id, "connecting telemetry link");

        let (ws, _) = timeout(config.connect_timeout(), connect_async(url.as_str()))
            .await
            .map_err(|_| LinkError::Timeout(endpoint.clone()))??;

        let (events_tx, events_rx) = mpsc::channel(config.event_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let client_id = config.client_id.clone();
        let reader = tokio::spawn(async move {
            run_reader(ws, events_tx, shutdown_rx, client_id).await;
        });

        info!(%endpoint, "telemetry link open");
        Ok(Self {
            endpoint,
            events_rx,
            shutdown: Some(shutdown_tx),
            reader: Some(reader),
            closed: false,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Next event in arrival order. Always `None` once `close` was called,
    /// even if frames were still queued.
    pub async fn recv(&mut self) -> Option<LinkEvent> {
        if self.closed {
            return None;
        }
        self.events_rx.recv().await
    }

    /// Release the connection. Returns true only for the call that did it.
    pub async fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        self.events_rx.close();
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.reader.take() {
            if let Err(err) = handle.await {
                warn!(?err, "telemetry reader task failed");
            }
        }
        info!(endpoint = %self.endpoint, "telemetry link closed");
        true
    }
}

impl Drop for TelemetryLink {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            debug!(endpoint = %self.endpoint, "telemetry link dropped without close");
            let _ = tx.send(());
        }
    }
}

async fn run_reader(
    ws: WsStream,
    events_tx: mpsc::Sender<LinkEvent>,
    mut shutdown: oneshot::Receiver<()>,
    client_id: String,
) {
    let (mut write, mut read) = ws.split();
    let mut frames = 0u64;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                send_close(&mut write).await;
                break;
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    frames += 1;
                    // Fails only once the link is closed or dropped.
                    if events_tx.send(LinkEvent::Frame(text)).await.is_err() {
                        send_close(&mut write).await;
                        break;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(?frame, "telemetry source closed the link");
                    let _ = events_tx.send(LinkEvent::Closed).await;
                    break;
                }
                Some(Ok(other)) => {
                    debug!(?other, "ignoring non-text frame");
                }
                Some(Err(err)) => {
                    warn!(%err, "telemetry link failed");
                    let _ = events_tx.send(LinkEvent::Closed).await;
                    break;
                }
                None => {
                    let _ = events_tx.send(LinkEvent::Closed).await;
                    break;
                }
            }
        }
    }
    debug!(%client_id, frames, "telemetry reader finished");
}

// Close handshake only; no application message is ever sent.
async fn send_close(write: &mut SplitSink<WsStream, Message>) {
    if let Err(err) = write.send(Message::Close(None)).await {
        debug!(%err, "close frame not delivered");
    }
}
