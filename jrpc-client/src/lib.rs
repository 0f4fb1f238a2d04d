//! Correlating JSON-RPC 2.0 client over a pluggable transport
//!
//! This crate provides the connection engine: it matches responses to the calls
//! waiting for them across one multiplexed connection, delivers server-initiated
//! requests and notifications to a handler, and unwinds every outstanding call
//! exactly once when the connection closes.
//!
//! # Core Features
//!
//! - **Transports**: WebSocket out of the box, an in-memory pair for tests, or any
//!   [`Dialer`] / [`Connection`] implementation
//! - **Request-Response**: `send`, `send_async`, `send_until`, `send_timeout` and
//!   the typed `call`
//! - **Server requests**: one handler for inbound requests and notifications
//! - **Close semantics**: `close` or a transport close fails every pending call
//!   with `Error::Closed` and fires the close handler once
//! - **Observability**: tracing events and OpenTelemetry metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use jrpc_client::{Client, Request, WebSocketDialer};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(WebSocketDialer::new("ws://localhost:8080"));
//!     client.set_request_handler(|request| println!("server: {}", request.method()));
//!     client.connect().await?;
//!
//!     let response = client
//!         .send(Request::new("echo").with_params(json!(["hello"])))
//!         .await?;
//!     println!("Result: {:?}", response.result());
//!
//!     let total: i64 = client.call("add", [2, 3]).await?;
//!     println!("Sum: {}", total);
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

mod client;
mod client_builder;
mod connection;
mod handlers;
mod id;
pub mod memory;
mod metrics;
mod pending;
mod promise;
mod websocket;

pub use client::Client;
pub use client_builder::ClientBuilder;
pub use connection::{Connection, Dialer};
pub use handlers::{CloseHandler, RequestHandler};
pub use id::{IdGenerator, RandomIdGenerator, SequentialIdGenerator};
pub use metrics::ClientMetrics;
pub use promise::{Promise, ResponseFuture};
pub use websocket::{WebSocketConnection, WebSocketDialer};

pub use jrpc_core::{Error, ErrorObject, Id, Request, Response, Result};
