//! WebSocket transport
//!
//! Each JSON-RPC message travels in one text frame. Ping and pong frames are
//! handled by tungstenite and skipped here; binary frames are reported as
//! transport errors. A close frame, the end of the stream, or a reset connection
//! all surface as [`Error::Closed`].

use crate::connection::{Connection, Dialer};
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use jrpc_core::{Error, Result};
use std::io::ErrorKind;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::error::{Error as WsError, ProtocolError};
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Dials a WebSocket endpoint
///
/// ```rust,no_run
/// use jrpc_client::{Client, WebSocketDialer};
///
/// # async fn example() -> jrpc_core::Result<()> {
/// let dialer = WebSocketDialer::new("ws://localhost:8080/rpc")
///     .with_header("Authorization", "Bearer secret");
/// let client = Client::new(dialer);
/// client.connect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct WebSocketDialer {
    url: String,
    headers: Vec<(String, String)>,
}

impl WebSocketDialer {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Add a header to the opening handshake
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Dialer for WebSocketDialer {
    async fn dial(&self) -> Result<Box<dyn Connection>> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| Error::Transport(e.to_string()))?;

        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Transport(format!("invalid header name {:?}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Transport(format!("invalid value for header {}: {}", name, e)))?;
            request.headers_mut().append(name, value);
        }

        let (ws_stream, _) = connect_async(request)
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        tracing::debug!(url = %self.url, "WebSocket handshake complete");
        Ok(Box::new(WebSocketConnection::new(ws_stream)))
    }
}

/// An open WebSocket, split so reads and writes do not block each other
pub struct WebSocketConnection {
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    fn new(ws_stream: WsStream) -> Self {
        let (sink, stream) = ws_stream.split();
        Self {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        }
    }
}

#[async_trait]
impl Connection for WebSocketConnection {
    async fn write(&self, message: String) -> Result<()> {
        self.sink
            .lock()
            .await
            .send(Message::Text(message))
            .await
            .map_err(map_ws_error)
    }

    async fn read(&self) -> Result<String> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(?frame, "Close frame received");
                    return Err(Error::Closed);
                }
                Some(Ok(Message::Binary(data))) => {
                    return Err(Error::Transport(format!(
                        "unexpected binary frame of {} bytes",
                        data.len()
                    )))
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(map_ws_error(e)),
                None => return Err(Error::Closed),
            }
        }
    }

    async fn close(&self) -> Result<()> {
        self.sink.lock().await.close().await.map_err(map_ws_error)
    }
}

fn map_ws_error(err: WsError) -> Error {
    match err {
        WsError::ConnectionClosed
        | WsError::AlreadyClosed
        | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => Error::Closed,
        WsError::Io(ref e)
            if matches!(
                e.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::UnexpectedEof
            ) =>
        {
            Error::Closed
        }
        other => Error::Transport(other.to_string()),
    }
}
