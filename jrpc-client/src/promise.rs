//! Single-assignment completion cell
//!
//! A [`Promise`] is set exactly once and can be awaited by any number of
//! waiters, from any number of tasks. Every waiter observes the same value.
//!
//! ```rust
//! use jrpc_client::Promise;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let promise: Promise<u32> = Promise::new();
//! let waiter = promise.clone();
//! let task = tokio::spawn(async move { waiter.wait().await });
//!
//! assert!(promise.set(Ok(7)));
//! assert!(!promise.set(Ok(8)));
//! assert_eq!(task.await.unwrap().unwrap(), 7);
//! # }
//! ```

use futures::future::{BoxFuture, FutureExt};
use jrpc_core::{Error, Response, Result};
use std::fmt;
use std::future::IntoFuture;
use std::sync::{Arc, OnceLock};
use tokio::sync::Notify;

/// Promise resolved with the response to one call
pub type ResponseFuture = Promise<Response>;

struct Shared<T> {
    value: OnceLock<Result<T>>,
    notify: Notify,
}

/// Settable-once value or error, observable by many waiters
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self {
            shared: Arc::new(Shared {
                value: OnceLock::new(),
                notify: Notify::new(),
            }),
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("is_set", &self.is_set())
            .finish()
    }
}

impl<T> Promise<T> {
    /// Create an unset promise
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a promise that has already failed
    pub fn failed(error: Error) -> Self {
        let promise = Self::new();
        promise.set(Err(error));
        promise
    }

    /// Store the outcome
    ///
    /// Returns `true` for the one call that wins. Every later call returns `false`
    /// and leaves the stored outcome untouched.
    pub fn set(&self, outcome: Result<T>) -> bool {
        let won = self.shared.value.set(outcome).is_ok();
        if won {
            self.shared.notify.notify_waiters();
        }
        won
    }

    pub fn is_set(&self) -> bool {
        self.shared.value.get().is_some()
    }

    /// True when both handles refer to the same cell
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<T: Clone> Promise<T> {
    /// The outcome, if already set
    pub fn try_get(&self) -> Option<Result<T>> {
        self.shared.value.get().cloned()
    }

    /// Wait until the promise is set and return a copy of the outcome
    pub async fn wait(&self) -> Result<T> {
        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            // Register before checking, so a set() in between still wakes us
            notified.as_mut().enable();

            if let Some(outcome) = self.shared.value.get() {
                return outcome.clone();
            }
            notified.await;
        }
    }
}

impl<T> IntoFuture for Promise<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = Result<T>;
    type IntoFuture = BoxFuture<'static, Result<T>>;

    fn into_future(self) -> Self::IntoFuture {
        async move { self.wait().await }.boxed()
    }
}
