//! JSON-RPC 2.0 message model
//!
//! Three value types travel on the wire:
//!
//! 1. **Request**: a method call. Without an id it is a *notification* and is
//!    never answered.
//! 2. **Response**: the answer to a request, carrying exactly one of `result`
//!    or `error`.
//! 3. **ErrorObject**: the `error` member of a failed response (see
//!    [`crate::error`]).
//!
//! Both message types are built with chained options that apply in call order,
//! so a later id option replaces an earlier one:
//!
//! ```rust
//! use jrpc_core::{Id, Request};
//! use serde_json::json;
//!
//! let request = Request::new("pong")
//!     .with_params(json!(["hello", "world"]))
//!     .with_string_id("draft")
//!     .with_numeric_id(554)
//!     .with_version("1.0");
//!
//! assert_eq!(request.id(), Some(&Id::Number(554)));
//! ```
//!
//! # Ids
//!
//! An [`Id`] is a string or an integer; absence is modelled with `Option<Id>`.
//! The two kinds never compare equal, so `1456` and `"1456"` are different
//! correlation keys.
//!
//! # Absent vs. null
//!
//! `params` and `result` keep the difference between an omitted member (`None`)
//! and an explicit JSON `null` (`Some(Value::Null)`), and both encode back to
//! exactly what was decoded.

use crate::error::{Error, ErrorObject, Result};
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Protocol version written when no override is given
pub const JSONRPC_VERSION: &str = "2.0";

/// Request/response correlation id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Id {
    /// String identifier
    String(String),
    /// Integer identifier
    Number(i64),
}

impl Id {
    /// Interpret a decoded JSON value as an id
    ///
    /// Numbers are always coerced to integers: `7` and `7.0` both give
    /// `Id::Number(7)`, while `7.5` or values outside the `i64` range are rejected.
    /// Objects, arrays, booleans and `null` are rejected with [`Error::InvalidId`].
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Id::String(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Ok(Id::Number(i));
                }
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                        Ok(Id::Number(f as i64))
                    }
                    _ => Err(Error::InvalidId(format!(
                        "{} is not representable as an integer id",
                        n
                    ))),
                }
            }
            Value::Null => Err(Error::InvalidId("null is not a valid id".into())),
            Value::Bool(_) => Err(Error::InvalidId("boolean is not a valid id".into())),
            Value::Array(_) => Err(Error::InvalidId("array is not a valid id".into())),
            Value::Object(_) => Err(Error::InvalidId("object is not a valid id".into())),
        }
    }

    /// Canonical text used as the pending-call key
    ///
    /// This is the JSON encoding of the id, so string ids are quoted and can never
    /// collide with an integer id.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::String(s) => write!(f, "{}", Value::String(s.clone())),
            Id::Number(n) => write!(f, "{}", n),
        }
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Id::from_value(&value).map_err(serde::de::Error::custom)
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::String(s)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::String(s.to_string())
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Number(n)
    }
}

impl From<i32> for Id {
    fn from(n: i32) -> Self {
        Id::Number(n.into())
    }
}

impl From<u32> for Id {
    fn from(n: u32) -> Self {
        Id::Number(n.into())
    }
}

impl TryFrom<u64> for Id {
    type Error = Error;

    fn try_from(n: u64) -> Result<Self> {
        i64::try_from(n)
            .map(Id::Number)
            .map_err(|_| Error::InvalidId(format!("{} exceeds the integer id range", n)))
    }
}

/// JSON-RPC request or notification
///
/// Fields are read through accessors; the only mutation after construction is
/// [`Request::ensure_id`], which fills in a missing id before first transmission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Id>,
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
    #[serde(rename = "jsonrpc")]
    version: String,
}

impl Request {
    /// Create a request with no id and no params
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            id: None,
            method: method.into(),
            params: None,
            version: JSONRPC_VERSION.to_string(),
        }
    }

    /// Set `params`; `Value::Null` is kept and encoded as an explicit `null`
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Serialize a value into `params`
    pub fn try_with_params<P: Serialize + ?Sized>(self, params: &P) -> Result<Self> {
        Ok(self.with_params(serde_json::to_value(params)?))
    }

    /// Set the id, replacing any earlier one
    pub fn with_id(mut self, id: impl Into<Id>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set a string id
    pub fn with_string_id(self, id: impl Into<String>) -> Self {
        self.with_id(Id::String(id.into()))
    }

    /// Set an integer id
    pub fn with_numeric_id(self, id: i64) -> Self {
        self.with_id(Id::Number(id))
    }

    /// Override the protocol version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> Option<&Value> {
        self.params.as_ref()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// A request without an id is a notification
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Deserialize `params`; omitted params are read as `null`
    pub fn params_as<T: DeserializeOwned>(&self) -> Result<T> {
        let params = self.params.clone().unwrap_or(Value::Null);
        Ok(serde_json::from_value(params)?)
    }

    /// Return the id, generating one first if the request has none
    pub fn ensure_id(&mut self, generate: impl FnOnce() -> Id) -> &Id {
        self.id.get_or_insert_with(generate)
    }
}

impl<'de> Deserialize<'de> for Request {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let envelope = Envelope::deserialize(deserializer)?;
        Request::try_from(envelope).map_err(serde::de::Error::custom)
    }
}

/// Outcome carried by a response
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Successful call; `Value::Null` is a legitimate result
    Result(Value),
    /// Failed call
    Error(ErrorObject),
}

/// JSON-RPC response
///
/// Exactly one of `result` and `error` is present; the [`Payload`] enum makes
/// any other combination unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    id: Option<Id>,
    payload: Payload,
    version: String,
}

impl Response {
    /// Successful response
    pub fn success(result: Value) -> Self {
        Self {
            id: None,
            payload: Payload::Result(result),
            version: JSONRPC_VERSION.to_string(),
        }
    }

    /// Successful response with a serialized result
    pub fn try_success<T: Serialize + ?Sized>(result: &T) -> Result<Self> {
        Ok(Self::success(serde_json::to_value(result)?))
    }

    /// Error response
    pub fn failure(error: ErrorObject) -> Self {
        Self {
            id: None,
            payload: Payload::Error(error),
            version: JSONRPC_VERSION.to_string(),
        }
    }

    /// Set the id, replacing any earlier one
    pub fn with_id(mut self, id: impl Into<Id>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set a string id
    pub fn with_string_id(self, id: impl Into<String>) -> Self {
        self.with_id(Id::String(id.into()))
    }

    /// Set an integer id
    pub fn with_numeric_id(self, id: i64) -> Self {
        self.with_id(Id::Number(id))
    }

    /// Override the protocol version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.payload {
            Payload::Result(value) => Some(value),
            Payload::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorObject> {
        match &self.payload {
            Payload::Result(_) => None,
            Payload::Error(error) => Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.payload, Payload::Result(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.payload, Payload::Error(_))
    }

    /// Turn the response into its result, or [`Error::JsonRpc`] for an error response
    pub fn into_result(self) -> Result<Value> {
        match self.payload {
            Payload::Result(value) => Ok(value),
            Payload::Error(error) => Err(Error::JsonRpc(error)),
        }
    }

    /// Deserialize the result; an error response yields [`Error::JsonRpc`]
    pub fn result_as<T: DeserializeOwned>(&self) -> Result<T> {
        match &self.payload {
            Payload::Result(value) => Ok(serde_json::from_value(value.clone())?),
            Payload::Error(error) => Err(Error::JsonRpc(error.clone())),
        }
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(id) = &self.id {
            map.serialize_entry("id", id)?;
        }
        match &self.payload {
            Payload::Result(value) => map.serialize_entry("result", value)?,
            Payload::Error(error) => map.serialize_entry("error", error)?,
        }
        map.serialize_entry("jsonrpc", &self.version)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for Response {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let envelope = Envelope::deserialize(deserializer)?;
        Response::try_from(envelope).map_err(serde::de::Error::custom)
    }
}

/// A decoded inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Carries `method`: a request or notification
    Request(Request),
    /// Carries `result` or `error`
    Response(Response),
    /// A JSON array; items are decoded one by one so a bad item does not spoil
    /// the rest
    Batch(Vec<Value>),
}

impl Message {
    pub fn is_request(&self) -> bool {
        matches!(self, Message::Request(_))
    }

    pub fn is_response(&self) -> bool {
        matches!(self, Message::Response(_))
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, Message::Batch(_))
    }
}

/// Every member a single message may carry, before we know what it is
///
/// Present-but-null members decode to `Some(Value::Null)` so classification can
/// tell them apart from omitted ones.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default, deserialize_with = "present")]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default, deserialize_with = "present")]
    params: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    result: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    error: Option<Value>,
    #[serde(default)]
    jsonrpc: Option<String>,
}

pub(crate) fn present<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl Envelope {
    /// Decide between request and response by which members are present
    pub(crate) fn classify(self) -> Result<Message> {
        let answers = self.result.is_some() || self.has_error();
        match (self.method.is_some(), answers) {
            (true, false) => Request::try_from(self).map(Message::Request),
            (false, true) => Response::try_from(self).map(Message::Response),
            (true, true) => Err(Error::InvalidMessage(
                "message carries both method and result/error".into(),
            )),
            (false, false) => Err(Error::InvalidMessage(
                "message carries neither method nor result/error".into(),
            )),
        }
    }

    /// `"error": null` is treated as an omitted member
    fn has_error(&self) -> bool {
        matches!(&self.error, Some(v) if !v.is_null())
    }

    /// An omitted `jsonrpc` member reads as the default version
    fn take_version(&mut self) -> String {
        self.jsonrpc
            .take()
            .unwrap_or_else(|| JSONRPC_VERSION.to_string())
    }
}

impl TryFrom<Envelope> for Request {
    type Error = Error;

    fn try_from(mut envelope: Envelope) -> Result<Self> {
        let method = envelope
            .method
            .take()
            .ok_or_else(|| Error::InvalidMessage("missing method member".into()))?;
        let version = envelope.take_version();
        let id = envelope.id.as_ref().map(Id::from_value).transpose()?;

        Ok(Request {
            id,
            method,
            params: envelope.params,
            version,
        })
    }
}

impl TryFrom<Envelope> for Response {
    type Error = Error;

    fn try_from(mut envelope: Envelope) -> Result<Self> {
        let version = envelope.take_version();
        let error = match envelope.error.take() {
            Some(Value::Null) | None => None,
            Some(value) => Some(
                serde_json::from_value::<ErrorObject>(value)
                    .map_err(|e| Error::InvalidMessage(format!("malformed error member: {}", e)))?,
            ),
        };

        let payload = match (envelope.result, error) {
            (Some(result), None) => Payload::Result(result),
            (None, Some(error)) => Payload::Error(error),
            (Some(_), Some(_)) => {
                return Err(Error::InvalidMessage(
                    "response carries both result and error".into(),
                ))
            }
            (None, None) => {
                return Err(Error::InvalidMessage(
                    "response carries neither result nor error".into(),
                ))
            }
        };

        // A null id is only meaningful on an error response, where the server
        // could not read the id of the request it is rejecting.
        let id = match envelope.id {
            None => None,
            Some(Value::Null) if matches!(payload, Payload::Error(_)) => None,
            Some(value) => Some(Id::from_value(&value)?),
        };

        Ok(Response {
            id,
            payload,
            version,
        })
    }
}
