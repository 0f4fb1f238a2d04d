//! Common test utilities for jrpc-client integration tests
//!
//! A mock WebSocket server scripted by a handler, plus helpers for building
//! wire frames.

#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use jrpc_client::{memory, Client, ErrorObject, Request, Response};
use jrpc_core::codec;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// What the mock server does in answer to one client frame
#[derive(Debug, Clone)]
pub enum Reply {
    /// Send a text frame
    Text(String),
    /// Close the WebSocket
    Close,
}

/// Mock WebSocket server for client testing
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    message_rx: mpsc::Receiver<String>,
}

impl MockWsServer {
    /// Start a server that answers every request with its own params
    pub async fn echo() -> Self {
        Self::with_handler(|text| match codec::decode_request(&text) {
            Ok(request) if !request.is_notification() => {
                let result = request.params().cloned().unwrap_or(Value::Null);
                vec![Reply::Text(success_for(&request, result))]
            }
            _ => Vec::new(),
        })
        .await
    }

    /// Start a mock server with a custom message handler
    ///
    /// The handler sees every text frame the client sends and returns the frames
    /// to send back, in order.
    pub async fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(String) -> Vec<Reply> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (msg_tx, msg_rx) = mpsc::channel::<String>(1024);
        let handler = Arc::new(handler);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    accepted = listener.accept() => {
                        let Ok((stream, _)) = accepted else { continue };
                        let msg_tx = msg_tx.clone();
                        let handler = Arc::clone(&handler);

                        tokio::spawn(async move {
                            let Ok(ws_stream) = accept_async(stream).await else { return };
                            let (mut write, mut read) = ws_stream.split();

                            while let Some(Ok(msg)) = read.next().await {
                                let Message::Text(text) = msg else { continue };
                                let _ = msg_tx.try_send(text.clone());

                                for reply in handler(text) {
                                    match reply {
                                        Reply::Text(frame) => {
                                            let _ = write.send(Message::Text(frame)).await;
                                        }
                                        Reply::Close => {
                                            let _ = write.close().await;
                                            return;
                                        }
                                    }
                                }
                            }
                        });
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            message_rx: msg_rx,
        }
    }

    /// Get the WebSocket URL for connecting to this server
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Wait up to five seconds for the next frame the server received
    pub async fn wait_for_message(&mut self) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(5), self.message_rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Stop accepting connections
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// A TCP listener that accepts connections and immediately drops them,
/// so the WebSocket handshake never completes
pub async fn refusing_listener() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            drop(stream);
        }
    });
    format!("ws://{}", addr)
}

/// A connected client over the in-memory transport, plus the remote end
pub async fn memory_client() -> (Client, memory::MemoryPeer) {
    let (dialer, peer) = memory::pair();
    let client = Client::new(dialer);
    client.connect().await.unwrap();
    (client, peer)
}

/// Encoded success response echoing the request's id
pub fn success_for(request: &Request, result: Value) -> String {
    let mut response = Response::success(result);
    if let Some(id) = request.id() {
        response = response.with_id(id.clone());
    }
    codec::encode_response(&response).unwrap()
}

/// Encoded error response echoing the request's id
pub fn error_for(request: &Request, error: ErrorObject) -> String {
    let mut response = Response::failure(error);
    if let Some(id) = request.id() {
        response = response.with_id(id.clone());
    }
    codec::encode_response(&response).unwrap()
}

/// Poll `condition` every few milliseconds for up to two seconds
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
