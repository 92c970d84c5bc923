use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::Client;
use super::ClientInner;
use crate::core::CorrelationRegistry;
use crate::core::Dispatcher;
use crate::core::RequestExecutor;
use crate::ClientConfig;
use crate::InboundMessage;
use crate::Result;
use crate::Transport;

pub struct ClientBuilder {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    prefix: String,
}

impl ClientBuilder {
    /// Create a new builder with default config for the device at `prefix`
    pub fn new(
        transport: Arc<dyn Transport>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            config: ClientConfig::default(),
            transport,
            prefix: prefix.into(),
        }
    }

    /// Set the default request timeout (default: none)
    ///
    /// Rounded up to whole milliseconds, at least one.
    pub fn request_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        let millis = u64::try_from(timeout.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX);
        self.config.request_timeout_in_ms = Some(millis.max(1));
        self
    }

    /// Set the response topic (default: `{prefix}/response`)
    pub fn response_topic(
        mut self,
        topic: impl Into<String>,
    ) -> Self {
        self.config.response_topic = Some(topic.into());
        self
    }

    /// Completely replaces the default configuration
    ///
    /// # Warning: Configuration Override
    /// This will discard all previous settings configured through individual
    /// methods like [`request_timeout`](ClientBuilder::request_timeout) or
    /// [`response_topic`](ClientBuilder::response_topic).
    ///
    /// # Example: Full Configuration
    /// ```ignore
    /// use miniconf_mqtt_client::{ClientBuilder, ClientConfig};
    ///
    /// let custom_config = ClientConfig {
    ///     request_timeout_in_ms: Some(500),
    ///     ..ClientConfig::default()
    /// };
    ///
    /// let builder = ClientBuilder::new(transport, "dt/sinara/dev").set_config(custom_config);
    /// ```
    pub fn set_config(
        mut self,
        config: ClientConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Subscribe to the response topic and start dispatching `inbound`
    ///
    /// `inbound` is the message stream of the same session as the
    /// transport. The subscription is in place before the client is handed
    /// out, so no response to one of its requests can be missed.
    pub async fn connect<S>(
        self,
        inbound: S,
    ) -> Result<Client>
    where
        S: Stream<Item = InboundMessage> + Send + Unpin + 'static,
    {
        self.config.validate()?;
        let response_topic = self.config.response_topic_for(&self.prefix);

        self.transport.subscribe(&response_topic).await?;
        info!("Subscribed to {}", response_topic);

        let registry = Arc::new(CorrelationRegistry::new());
        let shutdown = CancellationToken::new();
        let dispatcher =
            Dispatcher::new(registry.clone(), response_topic.clone()).spawn(inbound, shutdown.clone());
        let executor = RequestExecutor::new(
            self.transport.clone(),
            registry,
            &self.prefix,
            response_topic,
            self.config.request_timeout(),
        );

        Ok(Client {
            inner: Arc::new(ClientInner {
                prefix: self.prefix,
                transport: self.transport,
                executor,
                shutdown,
                dispatcher: Mutex::new(Some(dispatcher)),
            }),
        })
    }
}
