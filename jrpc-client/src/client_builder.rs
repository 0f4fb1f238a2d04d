//! Client builder for handlers, id generation and observability
//!
//! The `ClientBuilder` provides a fluent API for configuring a [`Client`] before
//! it connects. It allows you to:
//! - Choose how request ids are generated
//! - Install request and close handlers up front, so no inbound message can
//!   arrive before they are in place
//! - Configure observability (OpenTelemetry)
//!
//! # Examples
//!
//! ```rust,no_run
//! use jrpc_client::{ClientBuilder, WebSocketDialer};
//!
//! # async fn example() -> jrpc_core::Result<()> {
//! let client = ClientBuilder::new(WebSocketDialer::new("ws://localhost:8080"))
//!     .with_sequential_ids()
//!     .on_request(|request| println!("server says {}", request.method()))
//!     .on_close(|cause| println!("closed: {:?}", cause))
//!     .with_default_observability()
//!     .service_name("quote-client")
//!     .connect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::client::{Client, ClientParts};
use crate::connection::Dialer;
use crate::handlers::{CloseHandler, RequestHandler};
use crate::id::{IdGenerator, RandomIdGenerator, SequentialIdGenerator};
use crate::metrics::ClientMetrics;
use jrpc_core::{Error, ObservabilityConfig, Request, Result};
use std::sync::Arc;

/// Builder for configuring and creating a [`Client`]
pub struct ClientBuilder {
    dialer: Box<dyn Dialer>,
    id_generator: Arc<dyn IdGenerator>,
    request_handler: Option<RequestHandler>,
    close_handler: Option<CloseHandler>,
    observability_config: Option<ObservabilityConfig>,
    service_name: Option<String>,
}

impl ClientBuilder {
    /// Create a new client builder
    pub fn new<D: Dialer + 'static>(dialer: D) -> Self {
        Self {
            dialer: Box::new(dialer),
            id_generator: Arc::new(RandomIdGenerator::new()),
            request_handler: None,
            close_handler: None,
            observability_config: None,
            service_name: None,
        }
    }

    /// Use a custom source of request ids
    pub fn with_id_generator<G: IdGenerator + 'static>(mut self, generator: G) -> Self {
        self.id_generator = Arc::new(generator);
        self
    }

    /// Use integer ids counting up from 1
    pub fn with_sequential_ids(self) -> Self {
        self.with_id_generator(SequentialIdGenerator::new())
    }

    /// Handler for inbound requests and notifications
    pub fn on_request<F>(mut self, handler: F) -> Self
    where
        F: Fn(Request) + Send + Sync + 'static,
    {
        self.request_handler = Some(Arc::new(handler));
        self
    }

    /// Handler that runs once when the client becomes closed
    pub fn on_close<F>(mut self, handler: F) -> Self
    where
        F: Fn(Option<Error>) + Send + Sync + 'static,
    {
        self.close_handler = Some(Arc::new(handler));
        self
    }

    /// Enable OpenTelemetry observability with custom configuration
    pub fn with_observability(mut self, config: ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self
    }

    /// Enable OpenTelemetry observability with default configuration
    pub fn with_default_observability(mut self) -> Self {
        self.observability_config = Some(ObservabilityConfig::default());
        self
    }

    /// Set service name for observability (used if observability is enabled)
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Build the client without connecting
    ///
    /// If observability is enabled, the global telemetry pipeline is initialized
    /// here. A pipeline that is already installed, for instance by an earlier
    /// client, is kept and the new client records into it.
    pub fn build(self) -> Client {
        let metrics = self.observability_config.map(|mut config| {
            if let Some(name) = self.service_name {
                config.service_name = name;
            }

            if let Err(e) = jrpc_core::init_observability(config.clone()) {
                tracing::warn!(error = %e, "Observability not initialized, using the existing pipeline");
            }

            Arc::new(ClientMetrics::new(config.service_name))
        });

        Client::from_parts(ClientParts {
            dialer: self.dialer,
            id_generator: self.id_generator,
            request_handler: self.request_handler,
            close_handler: self.close_handler,
            metrics,
        })
    }

    /// Build the client and connect it
    pub async fn connect(self) -> Result<Client> {
        let client = self.build();
        client.connect().await?;
        Ok(client)
    }
}
