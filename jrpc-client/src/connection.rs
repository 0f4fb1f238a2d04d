//! Transport abstraction
//!
//! A [`Connection`] moves whole JSON-RPC frames as text. The client owns exactly
//! one, created by a [`Dialer`] when `connect` is called. `write` may run while a
//! `read` is in progress on another task.
//!
//! Implementations must report a graceful close, by either side, as
//! [`Error::Closed`](jrpc_core::Error::Closed). Any other read error is treated
//! as transient and the client keeps reading.

use async_trait::async_trait;
use jrpc_core::Result;

/// Bidirectional message channel
#[async_trait]
pub trait Connection: Send + Sync {
    /// Send one whole message
    async fn write(&self, message: String) -> Result<()>;

    /// Wait for the next whole message
    async fn read(&self) -> Result<String>;

    /// Close the channel; called once by the owning client
    async fn close(&self) -> Result<()>;
}

/// Opens one transport session
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self) -> Result<Box<dyn Connection>>;
}
