//! Callbacks for server-initiated traffic and for closure
//!
//! The request handler sees every inbound request and notification, in the order
//! the transport delivered them. It runs on the read task, so it should hand long
//! work off to a spawned task. The close handler runs once, when the client
//! becomes closed, with the error that caused it (`None` for a local `close`).
//!
//! A panic inside either handler is caught and logged.

use jrpc_core::{Error, Request};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

/// Callback for inbound requests and notifications
pub type RequestHandler = Arc<dyn Fn(Request) + Send + Sync>;

/// Callback for the transition to closed
pub type CloseHandler = Arc<dyn Fn(Option<Error>) + Send + Sync>;

/// A replaceable callback
struct Slot<F: ?Sized> {
    handler: RwLock<Option<Arc<F>>>,
}

impl<F: ?Sized> Slot<F> {
    fn new(handler: Option<Arc<F>>) -> Self {
        Self {
            handler: RwLock::new(handler),
        }
    }

    fn set(&self, handler: Arc<F>) {
        *self.handler.write().unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    fn get(&self) -> Option<Arc<F>> {
        self.handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub(crate) struct Handlers {
    request: Slot<dyn Fn(Request) + Send + Sync>,
    close: Slot<dyn Fn(Option<Error>) + Send + Sync>,
}

impl Handlers {
    pub(crate) fn new(request: Option<RequestHandler>, close: Option<CloseHandler>) -> Self {
        Self {
            request: Slot::new(request),
            close: Slot::new(close),
        }
    }

    pub(crate) fn set_request(&self, handler: RequestHandler) {
        self.request.set(handler);
    }

    pub(crate) fn set_close(&self, handler: CloseHandler) {
        self.close.set(handler);
    }

    /// Run the request handler; false if none is installed
    pub(crate) fn on_request(&self, request: Request) -> bool {
        let Some(handler) = self.request.get() else {
            tracing::debug!(method = %request.method(), "No request handler, dropping inbound request");
            return false;
        };

        let method = request.method().to_string();
        if catch_unwind(AssertUnwindSafe(|| handler(request))).is_err() {
            tracing::error!(method = %method, "Request handler panicked");
        }
        true
    }

    pub(crate) fn on_close(&self, cause: Option<Error>) {
        if let Some(handler) = self.close.get() {
            if catch_unwind(AssertUnwindSafe(|| handler(cause))).is_err() {
                tracing::error!("Close handler panicked");
            }
        }
    }
}
