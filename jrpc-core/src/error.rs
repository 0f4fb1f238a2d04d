//! Error types for jrpc
//!
//! Two kinds of error live here:
//!
//! - **Error**: the local failure taxonomy shared by the codec and the client
//! - **ErrorObject**: the `error` member of a JSON-RPC 2.0 response, exactly as it
//!   travels on the wire
//!
//! # Taxonomy
//!
//! - **Closed**: the client or its connection can no longer be used
//! - **Transport**: dial, read or write failures that are not a graceful close
//! - **Protocol**: malformed JSON, invalid ids, messages that are neither a
//!   request nor a response
//! - **Remote**: a well-formed error response, carried as [`Error::JsonRpc`]
//!
//! # Examples
//!
//! ```rust
//! use jrpc_core::{Error, ErrorObject};
//!
//! let remote = ErrorObject::method_not_found();
//! assert_eq!(remote.code, -32601);
//!
//! let error = Error::from(remote);
//! assert!(!error.is_closed());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for jrpc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reserved code: invalid JSON was received
pub const PARSE_ERROR: i32 = -32700;
/// Reserved code: the JSON is not a valid request object
pub const INVALID_REQUEST: i32 = -32600;
/// Reserved code: the method does not exist or is not available
pub const METHOD_NOT_FOUND: i32 = -32601;
/// Reserved code: invalid method parameters
pub const INVALID_PARAMS: i32 = -32602;
/// Reserved code: internal JSON-RPC error
pub const INTERNAL_ERROR: i32 = -32603;

/// Local error type for jrpc operations
///
/// `Clone` is required: when a client closes, the same error is delivered to
/// every call that is still waiting for a response.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The client, or the connection underneath it, has been closed
    #[error("connection has been closed")]
    Closed,

    /// An operation needed a connection but `connect` has not succeeded
    #[error("client is not connected")]
    NotConnected,

    /// `connect` was called on a client that already owns a connection
    #[error("client is already connected")]
    AlreadyConnected,

    /// Dial, read or write failure below the JSON-RPC layer
    #[error("transport error: {0}")]
    Transport(String),

    /// The payload is not valid JSON
    #[error("parse error: {0}")]
    Parse(String),

    /// Valid JSON that is not a well-formed JSON-RPC message
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The `id` member is neither a string nor an integer
    #[error("invalid id: {0}")]
    InvalidId(String),

    /// A call with the same id is already waiting for its response
    #[error("a call with id {0} is already in flight")]
    DuplicateId(String),

    /// Converting between Rust values and JSON failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The peer answered with an error response
    #[error("JSON-RPC error: {0}")]
    JsonRpc(#[from] ErrorObject),

    /// The caller stopped waiting before a response arrived
    #[error("request cancelled")]
    Cancelled,

    /// The caller's deadline passed before a response arrived
    #[error("request timeout")]
    Timeout,
}

impl Error {
    /// True for the closed sentinel
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::Closed)
    }

    /// True for failures caused by a malformed message
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Error::Parse(_) | Error::InvalidMessage(_) | Error::InvalidId(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// The `error` member of a JSON-RPC 2.0 response
///
/// `code` and `message` are mandatory. `data` is omitted from the encoding when
/// absent.
///
/// ```rust
/// use jrpc_core::ErrorObject;
/// use serde_json::json;
///
/// let error = ErrorObject::new(123, "error with data").with_data(json!("Some data"));
/// let text = serde_json::to_string(&error).unwrap();
/// assert_eq!(text, r#"{"code":123,"message":"error with data","data":"Some data"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// Numeric error code; -32768 to -32000 are reserved
    pub code: i32,

    /// Short description of the error
    pub message: String,

    /// Additional information defined by the server; an explicit `null` is kept
    #[serde(
        default,
        deserialize_with = "crate::types::present",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<serde_json::Value>,
}

impl ErrorObject {
    /// Create an error with a code and message
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach a `data` member
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// -32700
    pub fn parse_error() -> Self {
        Self::new(PARSE_ERROR, "parse error")
    }

    /// -32600
    pub fn invalid_request() -> Self {
        Self::new(INVALID_REQUEST, "invalid request")
    }

    /// -32601
    pub fn method_not_found() -> Self {
        Self::new(METHOD_NOT_FOUND, "method not found")
    }

    /// -32602
    pub fn invalid_params() -> Self {
        Self::new(INVALID_PARAMS, "invalid params")
    }

    /// -32603
    pub fn internal_error() -> Self {
        Self::new(INTERNAL_ERROR, "internal error")
    }
}

impl std::fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ErrorObject {}

impl From<&Error> for ErrorObject {
    /// Map a local failure onto a reserved code, keeping the detail in `data`
    fn from(err: &Error) -> Self {
        let base = match err {
            Error::JsonRpc(remote) => return remote.clone(),
            Error::Parse(_) => ErrorObject::parse_error(),
            Error::InvalidMessage(_) | Error::InvalidId(_) | Error::DuplicateId(_) => {
                ErrorObject::invalid_request()
            }
            Error::Serialization(_) => ErrorObject::invalid_params(),
            _ => ErrorObject::internal_error(),
        };
        base.with_data(serde_json::Value::String(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reserved_error_encoding() {
        let cases = [
            (ErrorObject::invalid_request(), r#"{"code":-32600,"message":"invalid request"}"#),
            (ErrorObject::method_not_found(), r#"{"code":-32601,"message":"method not found"}"#),
            (ErrorObject::invalid_params(), r#"{"code":-32602,"message":"invalid params"}"#),
            (ErrorObject::internal_error(), r#"{"code":-32603,"message":"internal error"}"#),
            (ErrorObject::parse_error(), r#"{"code":-32700,"message":"parse error"}"#),
        ];

        for (error, expected) in cases {
            assert_eq!(serde_json::to_string(&error).unwrap(), expected);
            let decoded: ErrorObject = serde_json::from_str(expected).unwrap();
            assert_eq!(decoded, error);
        }
    }

    #[test]
    fn test_error_with_data_round_trip() {
        let text = r#"{"code":123,"message":"error with data","data":"Some data"}"#;
        let decoded: ErrorObject = serde_json::from_str(text).unwrap();

        assert_eq!(decoded.code, 123);
        assert_eq!(decoded.data, Some(json!("Some data")));
        assert_eq!(serde_json::to_string(&decoded).unwrap(), text);
    }

    #[test]
    fn test_null_data_is_kept() {
        let text = r#"{"code":1,"message":"x","data":null}"#;
        let decoded: ErrorObject = serde_json::from_str(text).unwrap();

        assert_eq!(decoded, ErrorObject::new(1, "x").with_data(serde_json::Value::Null));
        assert_eq!(serde_json::to_string(&decoded).unwrap(), text);

        let omitted: ErrorObject = serde_json::from_str(r#"{"code":1,"message":"x"}"#).unwrap();
        assert_eq!(omitted.data, None);
    }

    #[test]
    fn test_error_object_display() {
        let error = ErrorObject::new(-123, "some bug");
        assert_eq!(error.to_string(), "[-123] some bug");
    }

    #[test]
    fn test_closed_display_matches_sentinel_text() {
        assert_eq!(Error::Closed.to_string(), "connection has been closed");
        assert!(Error::Closed.is_closed());
        assert!(!Error::Timeout.is_closed());
    }

    #[test]
    fn test_protocol_classification() {
        assert!(Error::Parse("eof".into()).is_protocol());
        assert!(Error::InvalidId("true".into()).is_protocol());
        assert!(!Error::Transport("reset".into()).is_protocol());
        assert!(!Error::JsonRpc(ErrorObject::internal_error()).is_protocol());
    }

    #[test]
    fn test_local_error_maps_to_reserved_code() {
        let object = ErrorObject::from(&Error::InvalidId("[1]".into()));
        assert_eq!(object.code, INVALID_REQUEST);
        assert!(object.data.is_some());

        let remote = ErrorObject::new(7, "custom");
        assert_eq!(ErrorObject::from(&Error::JsonRpc(remote.clone())), remote);

        assert_eq!(ErrorObject::from(&Error::Closed).code, INTERNAL_ERROR);
    }

    #[test]
    fn test_serde_error_conversion() {
        let err = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        match Error::from(err) {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            other => panic!("expected serialization error, got {:?}", other),
        }
    }
}
