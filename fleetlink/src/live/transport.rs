//! Transport abstraction for the live link.
//!
//! The [`LiveLink`](super::LiveLink) driver is generic over [`Transport`] so
//! tests can script connections without a server. [`WebSocketTransport`] is
//! the production implementation on `tokio-tungstenite`.

use std::future::Future;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::error::LiveError;

/// Opens connections to a live server.
pub trait Transport: Send + Sync + 'static {
    type Conn: Connection;

    /// Connect to `url`.
    fn connect(&self, url: &str) -> impl Future<Output = Result<Self::Conn, LiveError>> + Send;
}

/// An open, bidirectional text-frame connection.
pub trait Connection: Send + 'static {
    /// Send one text frame.
    fn send(&mut self, text: String) -> impl Future<Output = Result<(), LiveError>> + Send;

    /// Receive the next text frame. `None` means the peer closed.
    fn recv(&mut self) -> impl Future<Output = Option<Result<String, LiveError>>> + Send;

    /// Close the connection.
    fn close(&mut self) -> impl Future<Output = Result<(), LiveError>> + Send;
}

/// WebSocket transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl Transport for WebSocketTransport {
    type Conn = WebSocketConnection;

    async fn connect(&self, url: &str) -> Result<Self::Conn, LiveError> {
        let (stream, response) =
            tokio_tungstenite::connect_async(url)
                .await
                .map_err(|e| LiveError::Connect {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
        tracing::debug!(url, status = %response.status(), "WebSocket handshake complete");
        Ok(WebSocketConnection { stream })
    }
}

/// An open WebSocket connection.
pub struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Connection for WebSocketConnection {
    async fn send(&mut self, text: String) -> Result<(), LiveError> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| LiveError::Send(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, LiveError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => tracing::debug!("Ignoring non-UTF-8 binary frame"),
                },
                Ok(Message::Close(frame)) => {
                    tracing::debug!(?frame, "WebSocket closed by peer");
                    return None;
                }
                // Ping/pong are answered by tungstenite
                Ok(_) => continue,
                Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed) => return None,
                Err(e) => return Some(Err(LiveError::Receive(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) -> Result<(), LiveError> {
        self.stream
            .close(None)
            .await
            .map_err(|e| LiveError::Send(e.to_string()))
    }
}

impl std::fmt::Debug for WebSocketConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketConnection").finish_non_exhaustive()
    }
}
