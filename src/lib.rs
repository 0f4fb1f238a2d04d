//! jrpc - correlating JSON-RPC 2.0 client
//!
//! This is the convenience crate that re-exports the jrpc sub-crates.
//! Use it if you want a single dependency for the wire types and the client.
//!
//! # Architecture
//!
//! - **jrpc-core**: Core types, codec, error handling, observability
//! - **jrpc-client**: Connection engine, transports, pending-call table
//!
//! # Quick Start
//!
//! The in-memory transport plays the server side here; swap in a
//! [`WebSocketDialer`] to talk to a real endpoint.
//!
//! ```rust
//! use jrpc::{memory, Client, Request, Response};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (dialer, peer) = memory::pair();
//!     let client = Client::new(dialer);
//!     client.connect().await?;
//!
//!     let pending = client.send_async(Request::new("add").with_params(json!([5, 3]))).await;
//!
//!     let request = peer.recv_request().await?;
//!     let id = request.id().cloned().ok_or("request without id")?;
//!     peer.send_response(&Response::success(json!(8)).with_id(id))?;
//!
//!     let response = pending.await?;
//!     assert_eq!(response.result(), Some(&json!(8)));
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

pub use jrpc_client as client;
pub use jrpc_core as core;

pub use jrpc_client::{memory, Client, ClientBuilder, WebSocketDialer};
pub use jrpc_core::{codec, Error, ErrorObject, Id, Request, Response, Result};
