//! Codec for JSON-RPC message serialization and deserialization
//!
//! The codec turns single wire frames into [`Message`] values and back. Inbound
//! frames are classified **structurally**: an object carrying `method` is a
//! request, one carrying `result` or `error` is a response. Text that merely
//! mentions `"method"` inside `params` cannot confuse it.
//!
//! # Batch Messages
//!
//! A JSON array is returned as [`Message::Batch`] with the raw items, so each
//! item can be decoded on its own with [`decode_batch_messages`] and a single bad
//! item does not poison the rest.
//!
//! # Error Handling
//!
//! - Invalid JSON → [`Error::Parse`]
//! - Valid JSON that is not a request or response → [`Error::InvalidMessage`]
//! - Unusable `id` member → [`Error::InvalidId`]
//! - Failing to serialize a value → [`Error::Serialization`]
//!
//! # Examples
//!
//! ```rust
//! use jrpc_core::{codec, Request};
//!
//! let request = Request::new("ping").with_numeric_id(1);
//! let json = codec::encode_request(&request).unwrap();
//! assert_eq!(json, r#"{"id":1,"method":"ping","jsonrpc":"2.0"}"#);
//!
//! let decoded = codec::decode(&json).unwrap();
//! assert!(decoded.is_request());
//! ```

use crate::error::{Error, Result};
use crate::types::{Envelope, Message, Request, Response};
use serde::Serialize;
use serde_json::Value;

/// Encode any serializable message to a JSON string
pub fn encode<T: Serialize + ?Sized>(msg: &T) -> Result<String> {
    serde_json::to_string(msg).map_err(|e| Error::Serialization(e.to_string()))
}

/// Encode a request or notification
pub fn encode_request(req: &Request) -> Result<String> {
    encode(req)
}

/// Encode a response
pub fn encode_response(resp: &Response) -> Result<String> {
    encode(resp)
}

/// Decode one wire frame
///
/// # Errors
///
/// - [`Error::Parse`] if the text is not JSON
/// - [`Error::InvalidMessage`] for an empty array, a non-object, or an object
///   that is neither a request nor a response
/// - [`Error::InvalidId`] if the `id` member is not a string or integer
///
/// # Examples
///
/// ```rust
/// use jrpc_core::{codec, Message};
///
/// let msg = codec::decode(r#"{"id":"req-1","method":"ping","jsonrpc":"2.0"}"#).unwrap();
/// assert!(msg.is_request());
///
/// let msg = codec::decode(r#"{"result":"hello","jsonrpc":"2.0"}"#).unwrap();
/// assert!(msg.is_response());
///
/// let msg = codec::decode(r#"[{"id":1,"result":1,"jsonrpc":"2.0"}]"#).unwrap();
/// assert!(matches!(msg, Message::Batch(items) if items.len() == 1));
/// ```
pub fn decode(data: &str) -> Result<Message> {
    let value: Value = serde_json::from_str(data).map_err(|e| Error::Parse(e.to_string()))?;
    decode_value(value)
}

/// Classify an already-parsed JSON value
pub fn decode_value(value: Value) -> Result<Message> {
    match value {
        Value::Array(items) if items.is_empty() => {
            Err(Error::InvalidMessage("batch cannot be empty".into()))
        }
        Value::Array(items) => Ok(Message::Batch(items)),
        Value::Object(_) => envelope(value)?.classify(),
        other => Err(Error::InvalidMessage(format!(
            "expected an object or array, got {}",
            kind(&other)
        ))),
    }
}

/// Decode a frame that must be a request
pub fn decode_request(data: &str) -> Result<Request> {
    match decode(data)? {
        Message::Request(request) => Ok(request),
        _ => Err(Error::InvalidMessage("expected a request".into())),
    }
}

/// Decode a frame that must be a response
pub fn decode_response(data: &str) -> Result<Response> {
    match decode(data)? {
        Message::Response(response) => Ok(response),
        _ => Err(Error::InvalidMessage("expected a response".into())),
    }
}

/// Decode the items of a batch one by one
///
/// Nested arrays are rejected; a batch item must be a single message.
pub fn decode_batch_messages(values: Vec<Value>) -> Vec<Result<Message>> {
    values
        .into_iter()
        .map(|value| match value {
            Value::Array(_) => Err(Error::InvalidMessage("nested batch".into())),
            other => decode_value(other),
        })
        .collect()
}

fn envelope(value: Value) -> Result<Envelope> {
    serde_json::from_value(value).map_err(|e| Error::InvalidMessage(e.to_string()))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
