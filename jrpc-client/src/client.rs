//! JSON-RPC client engine
//!
//! This module provides [`Client`], which owns one connection, correlates
//! responses with the calls that are waiting for them, and delivers
//! server-initiated requests to a handler.
//!
//! # Client Lifecycle
//!
//! 1. **Construct**: `Client::new(dialer)` does no I/O
//! 2. **Connect**: dial the transport and start the read task
//! 3. **Use**: send requests, receive server requests
//! 4. **Close**: by `close()` or by the transport; every waiting call fails with
//!    [`Error::Closed`] and the close handler runs once
//!
//! A closed client stays closed. Sends after closure fail immediately without
//! touching the transport.
//!
//! # Cloning
//!
//! `Client` is cheaply cloneable using `Arc` internally. All clones share the
//! same connection and pending calls. Dropping the last clone closes the client
//! like `close()` would, except that the connection is shut down by the read
//! task in the background.

use crate::connection::{Connection, Dialer};
use crate::handlers::{CloseHandler, Handlers, RequestHandler};
use crate::id::{IdGenerator, RandomIdGenerator};
use crate::metrics::ClientMetrics;
use crate::pending::PendingCalls;
use crate::promise::{Promise, ResponseFuture};
use jrpc_core::{codec, Error, Message, Request, Response, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};
use tracing::Instrument;

/// Everything a [`Client`] is made of, assembled by the builder
pub(crate) struct ClientParts {
    pub(crate) dialer: Box<dyn Dialer>,
    pub(crate) id_generator: Arc<dyn IdGenerator>,
    pub(crate) request_handler: Option<RequestHandler>,
    pub(crate) close_handler: Option<CloseHandler>,
    pub(crate) metrics: Option<Arc<ClientMetrics>>,
}

/// JSON-RPC 2.0 client over a pluggable transport
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    dialer: Box<dyn Dialer>,
    /// Set once by `connect`, never replaced
    connection: OnceLock<Arc<dyn Connection>>,
    /// Serializes `connect` calls
    connecting: Mutex<()>,
    /// Serializes writes so frames never interleave
    write_lock: Mutex<()>,
    pending: PendingCalls,
    closed: AtomicBool,
    /// Wakes the read task on close or drop
    close_signal: Arc<Notify>,
    handlers: Handlers,
    id_generator: Arc<dyn IdGenerator>,
    metrics: Option<Arc<ClientMetrics>>,
}

impl Client {
    /// Create a client with default settings
    ///
    /// Ids are random strings; there are no handlers and no metrics. Use
    /// [`ClientBuilder`](crate::ClientBuilder) for anything else.
    pub fn new<D: Dialer + 'static>(dialer: D) -> Self {
        Self::from_parts(ClientParts {
            dialer: Box::new(dialer),
            id_generator: Arc::new(RandomIdGenerator::new()),
            request_handler: None,
            close_handler: None,
            metrics: None,
        })
    }

    pub(crate) fn from_parts(parts: ClientParts) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                dialer: parts.dialer,
                connection: OnceLock::new(),
                connecting: Mutex::new(()),
                write_lock: Mutex::new(()),
                pending: PendingCalls::new(),
                closed: AtomicBool::new(false),
                close_signal: Arc::new(Notify::new()),
                handlers: Handlers::new(parts.request_handler, parts.close_handler),
                id_generator: parts.id_generator,
                metrics: parts.metrics,
            }),
        }
    }

    /// Dial the transport and start reading
    ///
    /// A failed dial leaves the client untouched, so `connect` may be retried.
    ///
    /// # Errors
    ///
    /// - [`Error::Closed`] if the client was closed
    /// - [`Error::AlreadyConnected`] if a connection is already established
    /// - The dialer's error
    #[tracing::instrument(skip(self))]
    pub async fn connect(&self) -> Result<()> {
        let _connecting = self.inner.connecting.lock().await;
        if self.is_closed() {
            return Err(Error::Closed);
        }
        if self.inner.connection.get().is_some() {
            return Err(Error::AlreadyConnected);
        }

        tracing::info!("Connecting");
        let connection: Arc<dyn Connection> = Arc::from(self.inner.dialer.dial().await?);
        if self.inner.connection.set(Arc::clone(&connection)).is_err() {
            return Err(Error::AlreadyConnected);
        }

        // close() may have run while we were dialing; it could not see this connection
        if self.is_closed() {
            if let Err(e) = connection.close().await {
                tracing::debug!(error = %e, "Error closing connection opened during close");
            }
            return Err(Error::Closed);
        }

        tokio::spawn(
            ClientInner::read_loop(
                Arc::downgrade(&self.inner),
                Arc::clone(&self.inner.close_signal),
                connection,
            )
                .instrument(tracing::info_span!("jrpc_read_loop")),
        );

        tracing::info!("Connected");
        Ok(())
    }

    /// Send a request and return the promise for its response
    ///
    /// A request without an id gets one from the id generator. The returned promise
    /// has already failed if the client is closed or not connected, if the request
    /// cannot be encoded, if its id is already in flight, or if the write fails.
    pub async fn send_async(&self, mut request: Request) -> ResponseFuture {
        let generator = &self.inner.id_generator;
        let key = request.ensure_id(|| generator.next_id()).canonical();

        if self.is_closed() {
            return Promise::failed(Error::Closed);
        }
        let Some(connection) = self.inner.connection.get() else {
            return Promise::failed(Error::NotConnected);
        };
        let text = match codec::encode_request(&request) {
            Ok(text) => text,
            Err(e) => return Promise::failed(e),
        };

        let future = ResponseFuture::new();
        // Registered before the write, so even an immediate response finds it
        if let Err(e) = self.inner.pending.store(key.clone(), future.clone()) {
            return Promise::failed(e);
        }
        self.inner.record_pending(1);

        let written = {
            let _guard = self.inner.write_lock.lock().await;
            connection.write(text).await
        };

        match written {
            Ok(()) => tracing::debug!(id = %key, method = %request.method(), "Request sent"),
            Err(e) => {
                tracing::debug!(id = %key, error = %e, "Request write failed");
                if self.inner.pending.retract(&key, &future) {
                    self.inner.record_pending(-1);
                }
                future.set(Err(e));
            }
        }

        future
    }

    /// Send a request and wait for its response
    ///
    /// An error response from the server is a successful call: it comes back as
    /// `Ok` with [`Response::error`] set.
    #[tracing::instrument(skip(self, request), fields(method = %request.method()))]
    pub async fn send(&self, request: Request) -> Result<Response> {
        let start = Instant::now();
        let method = request.method().to_string();
        let result = self.send_async(request).await.wait().await;
        self.inner.record_call(&method, &result, start);
        result
    }

    /// Send a request and wait for its response or for `cancel`, whichever is first
    ///
    /// On cancellation this returns [`Error::Cancelled`]. The call stays registered:
    /// a late response still completes it, and `close` fails it.
    pub async fn send_until<C>(&self, request: Request, cancel: C) -> Result<Response>
    where
        C: Future,
    {
        let future = self.send_async(request).await;
        tokio::select! {
            biased;
            result = future.wait() => result,
            _ = cancel => Err(Error::Cancelled),
        }
    }

    /// Send a request and wait at most `timeout` for its response
    pub async fn send_timeout(&self, request: Request, timeout: Duration) -> Result<Response> {
        let future = self.send_async(request).await;
        tokio::time::timeout(timeout, future.wait())
            .await
            .map_err(|_| Error::Timeout)?
    }

    /// Call `method` with typed params and decode the typed result
    ///
    /// Params that serialize to `null` (such as `()`) are omitted. An error response
    /// is returned as [`Error::JsonRpc`].
    ///
    /// ```rust,no_run
    /// # async fn example(client: jrpc_client::Client) -> jrpc_core::Result<()> {
    /// let sum: i64 = client.call("add", [5, 3]).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call<P, R>(&self, method: impl Into<String>, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let params = serde_json::to_value(params)?;
        let mut request = Request::new(method);
        if !params.is_null() {
            request = request.with_params(params);
        }

        self.send(request).await?.result_as()
    }

    /// Send a notification; no response is expected and nothing is registered
    pub async fn notify(&self, notification: Request) -> Result<()> {
        if let Some(id) = notification.id() {
            return Err(Error::InvalidMessage(format!(
                "a notification cannot carry an id, got {}",
                id
            )));
        }
        let text = codec::encode_request(&notification)?;
        self.inner.write(text).await
    }

    /// Answer a request received through the request handler
    pub async fn respond(&self, response: Response) -> Result<()> {
        let text = codec::encode_response(&response)?;
        self.inner.write(text).await
    }

    /// Install the handler for inbound requests and notifications
    pub fn set_request_handler<F>(&self, handler: F)
    where
        F: Fn(Request) + Send + Sync + 'static,
    {
        self.inner.handlers.set_request(Arc::new(handler));
    }

    /// Install the handler that runs once when the client becomes closed
    pub fn set_close_handler<F>(&self, handler: F)
    where
        F: Fn(Option<Error>) + Send + Sync + 'static,
    {
        self.inner.handlers.set_close(Arc::new(handler));
    }

    /// Close the client
    ///
    /// The first call fails every waiting call with [`Error::Closed`], closes the
    /// connection and runs the close handler with `None`. Later calls return
    /// [`Error::Closed`] and do nothing else.
    pub async fn close(&self) -> Result<()> {
        self.inner.shutdown(None).await
    }

    /// True once connected and until closed
    pub fn is_connected(&self) -> bool {
        self.inner.connection.get().is_some() && !self.is_closed()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Number of calls waiting for a response
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("connected", &self.is_connected())
            .field("closed", &self.is_closed())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl ClientInner {
    async fn write(&self, text: String) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        let connection = self.connection.get().ok_or(Error::NotConnected)?;
        let _guard = self.write_lock.lock().await;
        connection.write(text).await
    }

    /// Transition to closed; only the first caller does any work
    async fn shutdown(&self, cause: Option<Error>) -> Result<()> {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::Closed);
        }

        let drained = self.pending.drain_all();
        self.record_pending(-(drained.len() as i64));
        for future in &drained {
            future.set(Err(Error::Closed));
        }

        // Stores a permit if the read task is not waiting right now
        self.close_signal.notify_one();

        if let Some(connection) = self.connection.get() {
            if let Err(e) = connection.close().await {
                tracing::debug!(error = %e, "Error closing connection");
            }
        }

        tracing::info!(
            cancelled = drained.len(),
            cause = ?cause,
            "Client closed"
        );
        self.handlers.on_close(cause);
        Ok(())
    }

    /// Holds the client only while handling a read, so dropping every handle
    /// ends the loop
    async fn read_loop(
        inner: Weak<ClientInner>,
        close_signal: Arc<Notify>,
        connection: Arc<dyn Connection>,
    ) {
        loop {
            let read = tokio::select! {
                _ = close_signal.notified() => break,
                read = connection.read() => read,
            };

            let Some(inner) = inner.upgrade() else {
                break;
            };
            if inner.closed.load(Ordering::Acquire) {
                break;
            }

            match read {
                Ok(text) => inner.dispatch(&text),
                Err(Error::Closed) => {
                    tracing::info!("Connection closed by peer");
                    // Err here means close() got there first
                    let _ = inner.shutdown(Some(Error::Closed)).await;
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Read failed, continuing");
                    inner.record_error("read");
                }
            }
        }

        if inner.strong_count() == 0 {
            if let Err(e) = connection.close().await {
                tracing::debug!(error = %e, "Error closing connection of dropped client");
            }
        }
        tracing::debug!("Read loop stopped");
    }

    fn dispatch(&self, text: &str) {
        match codec::decode(text) {
            Ok(Message::Batch(items)) => {
                tracing::debug!(batch_size = items.len(), "Batch received");
                for item in codec::decode_batch_messages(items) {
                    match item {
                        Ok(message) => self.dispatch_message(message),
                        Err(e) => {
                            tracing::warn!(error = %e, "Dropping undecodable batch item");
                            self.record_error("decode");
                        }
                    }
                }
            }
            Ok(message) => self.dispatch_message(message),
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable message");
                self.record_error("decode");
            }
        }
    }

    fn dispatch_message(&self, message: Message) {
        match message {
            Message::Request(request) => {
                tracing::debug!(method = %request.method(), notification = request.is_notification(), "Inbound request");
                if let Some(m) = &self.metrics {
                    m.record_inbound_request(request.method());
                }
                self.handlers.on_request(request);
            }
            Message::Response(response) => self.complete(response),
            Message::Batch(_) => {
                tracing::warn!("Dropping nested batch");
                self.record_error("decode");
            }
        }
    }

    fn complete(&self, response: Response) {
        let Some(id) = response.id() else {
            tracing::warn!(error = ?response.error(), "Response without id matches no call");
            self.record_miss();
            return;
        };

        match self.pending.take(&id.canonical()) {
            Some(future) => {
                self.record_pending(-1);
                future.set(Ok(response));
            }
            None => {
                tracing::warn!(id = %id, "Response matches no pending call");
                self.record_miss();
            }
        }
    }

    fn record_call(&self, method: &str, result: &Result<Response>, start: Instant) {
        let Some(m) = &self.metrics else {
            return;
        };
        let status = match result {
            Ok(response) if response.is_success() => "success",
            Ok(_) => "error",
            Err(Error::Closed) => "closed",
            Err(_) => "failed",
        };
        m.record_request(method, status, start.elapsed().as_secs_f64());
    }

    fn record_pending(&self, delta: i64) {
        if let Some(m) = &self.metrics {
            if delta != 0 {
                m.record_pending(delta);
            }
        }
    }

    fn record_miss(&self) {
        if let Some(m) = &self.metrics {
            m.record_correlation_miss();
        }
    }

    fn record_error(&self, kind: &str) {
        if let Some(m) = &self.metrics {
            m.record_error(kind);
        }
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let drained = self.pending.drain_all();
        self.record_pending(-(drained.len() as i64));
        for future in &drained {
            future.set(Err(Error::Closed));
        }
        self.close_signal.notify_one();

        tracing::info!(cancelled = drained.len(), "Client dropped without close");
        self.handlers.on_close(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory;
    use async_trait::async_trait;
    use serde_json::json;

    struct BrokenConnection;

    #[async_trait]
    impl Connection for BrokenConnection {
        async fn write(&self, _message: String) -> Result<()> {
            Err(Error::Transport("write refused".into()))
        }

        async fn read(&self) -> Result<String> {
            std::future::pending().await
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    struct BrokenDialer;

    #[async_trait]
    impl Dialer for BrokenDialer {
        async fn dial(&self) -> Result<Box<dyn Connection>> {
            Ok(Box::new(BrokenConnection))
        }
    }

    struct RefusingDialer;

    #[async_trait]
    impl Dialer for RefusingDialer {
        async fn dial(&self) -> Result<Box<dyn Connection>> {
            Err(Error::Transport("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_send_before_connect() {
        let (dialer, _peer) = memory::pair();
        let client = Client::new(dialer);

        let result = client.send(Request::new("ping")).await;
        assert_eq!(result, Err(Error::NotConnected));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_dial_leaves_client_usable() {
        let client = Client::new(RefusingDialer);

        assert!(matches!(client.connect().await, Err(Error::Transport(_))));
        assert!(!client.is_connected());
        assert!(!client.is_closed());
        assert!(matches!(client.connect().await, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn test_write_failure_fails_the_call_and_clears_the_entry() {
        let client = Client::new(BrokenDialer);
        client.connect().await.unwrap();

        let future = client.send_async(Request::new("ping").with_numeric_id(1)).await;

        assert_eq!(
            future.try_get(),
            Some(Err(Error::Transport("write refused".into())))
        );
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_id_is_generated() {
        let (dialer, peer) = memory::pair();
        let client = Client::new(dialer);
        client.connect().await.unwrap();

        let _future = client.send_async(Request::new("ping")).await;
        let request = peer.recv_request().await.unwrap();

        assert!(matches!(request.id(), Some(jrpc_core::Id::String(s)) if s.len() == 20));
        assert_eq!(client.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_response_completes_matching_call() {
        let (dialer, peer) = memory::pair();
        let client = Client::new(dialer);
        client.connect().await.unwrap();

        let future = client.send_async(Request::new("ping").with_string_id("a")).await;
        peer.send_response(&Response::success(json!("pong")).with_string_id("a"))
            .unwrap();

        let response = future.await.unwrap();
        assert_eq!(response.result(), Some(&json!("pong")));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_in_flight_id_is_refused() {
        let (dialer, _peer) = memory::pair();
        let client = Client::new(dialer);
        client.connect().await.unwrap();

        let _first = client.send_async(Request::new("a").with_numeric_id(5)).await;
        let second = client.send_async(Request::new("b").with_numeric_id(5)).await;

        assert!(matches!(second.try_get(), Some(Err(Error::DuplicateId(_)))));
        assert_eq!(client.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_notify_rejects_an_id() {
        let (dialer, peer) = memory::pair();
        let client = Client::new(dialer);
        client.connect().await.unwrap();

        let result = client.notify(Request::new("tick").with_numeric_id(1)).await;
        assert!(matches!(result, Err(Error::InvalidMessage(_))));

        client.notify(Request::new("tick")).await.unwrap();
        assert_eq!(
            peer.recv().await.unwrap(),
            r#"{"method":"tick","jsonrpc":"2.0"}"#
        );
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_close_after_close() {
        let client = Client::new(BrokenDialer);
        client.connect().await.unwrap();

        assert_eq!(client.close().await, Ok(()));
        assert_eq!(client.close().await, Err(Error::Closed));
        assert_eq!(client.connect().await, Err(Error::Closed));
    }

    #[test]
    fn test_debug_output() {
        let (dialer, _peer) = memory::pair();
        let client = Client::new(dialer);
        let text = format!("{:?}", client);
        assert!(text.contains("connected: false"));
    }
}
