//! Reconnecting subscription to the server's telemetry push feed.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::sample::{parse_message, unix_now, TelemetrySample};
use crate::config::{ServiceConfig, TelemetryConfig};
use crate::error::{ConfigError, MalformedTelemetry, StreamError};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection phase of the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Open,
    Closed,
}

/// What the stream reports to its consumer.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    State(StreamState),
    Sample(TelemetrySample),
}

enum Exit {
    Closed,
    Shutdown,
}

/// Keeps a WebSocket subscription alive, forwarding well-formed samples.
///
/// After any disconnect (or failed handshake) it waits a fixed delay and
/// tries again, forever. Only the shutdown token or a dropped event receiver
/// ends it.
#[derive(Debug, Clone)]
pub struct TelemetryStream {
    url: Url,
    reconnect_delay: Duration,
}

impl TelemetryStream {
    pub fn new(url: Url, reconnect_delay: Duration) -> Self {
        TelemetryStream {
            url,
            reconnect_delay,
        }
    }

    pub fn from_config(
        service: &ServiceConfig,
        telemetry: &TelemetryConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(
            service.telemetry_url(&telemetry.stream_path)?,
            telemetry.reconnect_delay(),
        ))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    pub async fn run(self, events: mpsc::Sender<StreamEvent>, shutdown: CancellationToken) {
        loop {
            if !emit(&events, StreamEvent::State(StreamState::Connecting)).await {
                return;
            }
            debug!(url = %self.url, "connecting to telemetry stream");

            let connected = tokio::select! {
                _ = shutdown.cancelled() => return,
                result = connect_async(self.url.as_str()) => result.map_err(StreamError::from),
            };

            match connected {
                Ok((socket, _response)) => {
                    info!(url = %self.url, "telemetry stream open");
                    if !emit(&events, StreamEvent::State(StreamState::Open)).await {
                        return;
                    }
                    if let Exit::Shutdown = self.pump(socket, &events, &shutdown).await {
                        return;
                    }
                }
                Err(e) => warn!(error = %e, "telemetry stream unavailable"),
            }

            if !emit(&events, StreamEvent::State(StreamState::Closed)).await {
                return;
            }
            debug!(
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "telemetry stream closed, reconnecting after delay"
            );

            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    /// Read messages until the connection ends.
    async fn pump(
        &self,
        mut socket: Socket,
        events: &mpsc::Sender<StreamEvent>,
        shutdown: &CancellationToken,
    ) -> Exit {
        loop {
            let message = tokio::select! {
                _ = shutdown.cancelled() => {
                    let _ = socket.close(None).await;
                    return Exit::Shutdown;
                }
                message = socket.next() => message,
            };

            let delivered = match message {
                Some(Ok(Message::Text(text))) => forward(text.as_str(), events).await,
                Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => forward(text, events).await,
                    Err(_) => {
                        warn!(error = %MalformedTelemetry::NotText, "dropping telemetry message");
                        true
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    info!(?frame, "telemetry stream closed by server");
                    return Exit::Closed;
                }
                // Ping/pong are answered by tungstenite
                Some(Ok(_)) => true,
                Some(Err(e)) => {
                    warn!(error = %StreamError::Read(e), "telemetry stream dropped");
                    return Exit::Closed;
                }
                None => {
                    info!("telemetry stream ended");
                    return Exit::Closed;
                }
            };

            if !delivered {
                return Exit::Shutdown;
            }
        }
    }
}

/// Parse and forward one message. Returns false once the consumer is gone.
async fn forward(text: &str, events: &mpsc::Sender<StreamEvent>) -> bool {
    match parse_message(text, unix_now()) {
        Ok(sample) => emit(events, StreamEvent::Sample(sample)).await,
        Err(e @ MalformedTelemetry::UnexpectedType(_)) => {
            debug!(error = %e, "ignoring non-telemetry message");
            true
        }
        Err(e) => {
            warn!(error = %e, "dropping telemetry message");
            true
        }
    }
}

async fn emit(events: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> bool {
    events.send(event).await.is_ok()
}
