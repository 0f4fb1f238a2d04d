//! Core JSON-RPC 2.0 types and codec for jrpc
//!
//! This crate holds everything that does not need a connection:
//!
//! - **Types**: `Id`, `Request`, `Response` and the decoded `Message`
//! - **Codec**: encoding and structural classification of wire frames
//! - **Error handling**: the shared error taxonomy and the wire `ErrorObject`
//! - **Observability**: tracing and OpenTelemetry bootstrap
//!
//! The `jrpc-client` crate builds the connection engine on top of it.
//!
//! # Example
//!
//! ```rust
//! use jrpc_core::{codec, Request};
//! use serde_json::json;
//!
//! let request = Request::new("add")
//!     .with_params(json!({"a": 5, "b": 3}))
//!     .with_numeric_id(1);
//!
//! let json = codec::encode_request(&request).unwrap();
//! let decoded = codec::decode_request(&json).unwrap();
//! assert_eq!(decoded.method(), "add");
//! ```

pub mod codec;
pub mod error;
pub mod observability;
pub mod types;

pub use error::{Error, ErrorObject, Result};
pub use observability::{init_observability, shutdown_observability, LogFormat, ObservabilityConfig};
pub use types::{Id, Message, Payload, Request, Response, JSONRPC_VERSION};
