//! In-process transport
//!
//! [`pair`] returns a dialer for the client and the [`MemoryPeer`] that plays the
//! remote end. Messages travel through unbounded channels, so the peer can script
//! a server without any sockets.
//!
//! ```rust
//! use jrpc_client::{memory, Client, Request};
//! use jrpc_core::Response;
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> jrpc_core::Result<()> {
//! let (dialer, peer) = memory::pair();
//! let client = Client::new(dialer);
//! client.connect().await?;
//!
//! let pending = client.send_async(Request::new("ping").with_numeric_id(1)).await;
//! let request = peer.recv_request().await?;
//! peer.send_response(&Response::success(json!("pong")).with_numeric_id(1))?;
//!
//! assert_eq!(request.method(), "ping");
//! assert_eq!(pending.await?.result(), Some(&json!("pong")));
//! # Ok(())
//! # }
//! ```

use crate::connection::{Connection, Dialer};
use async_trait::async_trait;
use jrpc_core::{codec, Error, Request, Response, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// What the peer can put on the client's read side
enum Inbound {
    Message(String),
    Error(String),
}

/// Create a connected dialer/peer pair
pub fn pair() -> (MemoryDialer, MemoryPeer) {
    let (to_client, from_peer) = mpsc::unbounded_channel();
    let (to_peer, from_client) = mpsc::unbounded_channel();

    let connection = MemoryConnection {
        outbound: Mutex::new(Some(to_peer)),
        inbound: tokio::sync::Mutex::new(from_peer),
        closed: AtomicBool::new(false),
    };
    let dialer = MemoryDialer {
        connection: Mutex::new(Some(connection)),
    };
    let peer = MemoryPeer {
        inbound: Mutex::new(Some(to_client)),
        outbound: tokio::sync::Mutex::new(from_client),
    };

    (dialer, peer)
}

/// Dialer that hands out its connection once
pub struct MemoryDialer {
    connection: Mutex<Option<MemoryConnection>>,
}

#[async_trait]
impl Dialer for MemoryDialer {
    async fn dial(&self) -> Result<Box<dyn Connection>> {
        let connection = self
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match connection {
            Some(connection) => Ok(Box::new(connection)),
            None => Err(Error::Transport("memory connection already dialed".into())),
        }
    }
}

/// Client side of an in-process connection
pub struct MemoryConnection {
    outbound: Mutex<Option<UnboundedSender<String>>>,
    inbound: tokio::sync::Mutex<UnboundedReceiver<Inbound>>,
    closed: AtomicBool,
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn write(&self, message: String) -> Result<()> {
        let outbound = self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        match outbound.as_ref() {
            Some(sender) => sender.send(message).map_err(|_| Error::Closed),
            None => Err(Error::Closed),
        }
    }

    async fn read(&self) -> Result<String> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        match self.inbound.lock().await.recv().await {
            Some(Inbound::Message(text)) => Ok(text),
            Some(Inbound::Error(reason)) => Err(Error::Transport(reason)),
            None => Err(Error::Closed),
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}

/// Remote end of an in-process connection
pub struct MemoryPeer {
    inbound: Mutex<Option<UnboundedSender<Inbound>>>,
    outbound: tokio::sync::Mutex<UnboundedReceiver<String>>,
}

impl MemoryPeer {
    /// Next message written by the client; `None` once the client closed
    pub async fn recv(&self) -> Option<String> {
        self.outbound.lock().await.recv().await
    }

    /// A message written by the client, if one is already queued
    pub fn try_recv(&self) -> Option<String> {
        self.outbound.try_lock().ok()?.try_recv().ok()
    }

    /// Next message written by the client, decoded as a request
    pub async fn recv_request(&self) -> Result<Request> {
        let text = self.recv().await.ok_or(Error::Closed)?;
        codec::decode_request(&text)
    }

    /// Deliver a raw frame to the client
    pub fn send(&self, message: impl Into<String>) -> Result<()> {
        self.push(Inbound::Message(message.into()))
    }

    pub fn send_request(&self, request: &Request) -> Result<()> {
        self.send(codec::encode_request(request)?)
    }

    pub fn send_response(&self, response: &Response) -> Result<()> {
        self.send(codec::encode_response(response)?)
    }

    /// Make the client's next read fail with a transport error
    pub fn inject_error(&self, reason: impl Into<String>) -> Result<()> {
        self.push(Inbound::Error(reason.into()))
    }

    /// Close the peer's side; the client observes [`Error::Closed`]
    pub fn close(&self) {
        self.inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn push(&self, item: Inbound) -> Result<()> {
        let inbound = self.inbound.lock().unwrap_or_else(PoisonError::into_inner);
        match inbound.as_ref() {
            Some(sender) => sender.send(item).map_err(|_| Error::Closed),
            None => Err(Error::Closed),
        }
    }
}
