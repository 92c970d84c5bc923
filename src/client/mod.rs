//! Client module for remote Miniconf settings trees
//!
//! Provides the components for talking to one device over a [`Transport`]:
//! - [`Client`] - get/set/clear/list/dump of settings paths
//! - [`ClientBuilder`] - Configurable client construction
//!
//! # Basic Usage
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use miniconf_mqtt_client::Client;
//! use miniconf_mqtt_client::MemoryBroker;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let broker = MemoryBroker::new();
//!     let (transport, inbound) = broker.connect();
//!
//!     let client = Client::builder(Arc::new(transport), "dt/sinara/stabilizer/00-11-22-33-44-55")
//!         .request_timeout(Duration::from_secs(1))
//!         .connect(inbound)
//!         .await
//!         .unwrap();
//!
//!     client.set("/afe/0", &"G10", false).await.unwrap();
//!     let gain: String = client.get("/afe/0").await.unwrap();
//!     println!("gain: {gain}");
//!
//!     for path in client.list("").await.unwrap() {
//!         println!("{path}");
//!     }
//!
//!     client.close().await.unwrap();
//! }
//! ```

mod builder;

pub use builder::*;


use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;

use crate::core::Request;
use crate::core::RequestExecutor;
use crate::core::Response;
use crate::core::ResponseMode;
use crate::utils::ScopedTimer;
use crate::Error;
use crate::Result;
use crate::Transport;

/// Settings client bound to one device prefix
///
/// Owns the response dispatcher for its connection. Cheap to clone: all
/// clones share the same dispatcher and pending requests, so requests may be
/// issued concurrently from several tasks.
///
/// Created through the [`builder()`](Client::builder) method
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    prefix: String,
    transport: Arc<dyn Transport>,
    executor: RequestExecutor,
    shutdown: CancellationToken,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl Client {
    /// Create a configured client builder
    ///
    /// `prefix` addresses the device, e.g. `dt/sinara/stabilizer/00-11-22-33-44-55`.
    pub fn builder(
        transport: Arc<dyn Transport>,
        prefix: impl Into<String>,
    ) -> ClientBuilder {
        ClientBuilder::new(transport, prefix)
    }

    pub fn prefix(&self) -> &str {
        &self.inner.prefix
    }

    /// Topic on which this client receives responses
    pub fn response_topic(&self) -> &str {
        self.inner.executor.response_topic()
    }

    /// Whether [`close()`](Client::close) was called or the inbound stream ended
    pub fn is_closed(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Issue a raw request
    ///
    /// Escape hatch for callers needing per-request timeouts or raw payloads.
    pub async fn execute(
        &self,
        request: Request,
    ) -> Result<Response> {
        self.inner.executor.execute(request).await
    }

    /// Read the value of a leaf
    ///
    /// # Errors
    /// - [`RequestError::NotALeaf`](crate::RequestError::NotALeaf) if `path` addresses an internal node
    /// - [`RequestError::Protocol`](crate::RequestError::Protocol) if the device rejects the path
    /// - [`crate::CodecError`] if the value does not decode into `V`
    pub async fn get<V: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<V> {
        let _timer = ScopedTimer::new("get", path);
        let payload = self.leaf(Request::new(path, ResponseMode::Leaf)).await?;
        Ok(serde_json::from_slice(&payload)?)
    }

    /// Write the value of a leaf and return the device acknowledgement
    ///
    /// With `retain` the broker keeps the request so the device picks it up
    /// again after a restart.
    pub async fn set<V: Serialize + ?Sized>(
        &self,
        path: &str,
        value: &V,
        retain: bool,
    ) -> Result<String> {
        let _timer = ScopedTimer::new("set", path);
        let payload = serde_json::to_vec(value)?;
        let ack = self
            .leaf(
                Request::new(path, ResponseMode::Leaf)
                    .payload(payload)
                    .retain(retain),
            )
            .await?;
        Ok(String::from_utf8(ack.to_vec())?)
    }

    /// Clear the message retained by the broker for a path
    ///
    /// The device state is left unchanged. With `response` the device
    /// answers with the current value, which is returned.
    pub async fn clear(
        &self,
        path: &str,
        response: bool,
    ) -> Result<Option<Value>> {
        let _timer = ScopedTimer::new("clear", path);
        let mode = if response {
            ResponseMode::Leaf
        } else {
            ResponseMode::None
        };
        match self.execute(Request::new(path, mode).retain(true)).await? {
            Response::Leaf(payload) => Ok(Some(serde_json::from_slice(&payload)?)),
            _ => Ok(None),
        }
    }

    /// List the leaf paths below `root`
    ///
    /// When `root` itself is a leaf the device answers with its value. That
    /// answer comes back as a single element that does not start with `/`.
    pub async fn list(
        &self,
        root: &str,
    ) -> Result<Vec<String>> {
        let _timer = ScopedTimer::new("list", root);
        match self.execute(Request::new(root, ResponseMode::Multipart)).await? {
            Response::Parts(parts) => parts
                .into_iter()
                .map(|part| Ok(String::from_utf8(part.to_vec())?))
                .collect(),
            other => Err(Error::Fatal(format!("multipart request answered with {other:?}"))),
        }
    }

    /// Ask the device to republish every leaf below `root` onto its settings
    /// topic.
    ///
    /// Returns once the request is published; completion is not observable.
    pub async fn dump(
        &self,
        root: &str,
    ) -> Result<()> {
        let _timer = ScopedTimer::new("dump", root);
        self.execute(Request::new(root, ResponseMode::None)).await?;
        Ok(())
    }

    /// Stop the dispatcher, cancel every outstanding request and unsubscribe
    /// from the response topic.
    ///
    /// Outstanding calls fail with
    /// [`RequestError::Cancelled`](crate::RequestError::Cancelled). Calling
    /// `close` again is a no-op; a concurrent call returns once the first
    /// one has finished.
    pub async fn close(&self) -> Result<()> {
        // Held until unsubscribed.
        let mut guard = self.inner.dispatcher.lock().await;
        let Some(dispatcher) = guard.take() else {
            return Ok(());
        };

        self.inner.shutdown.cancel();
        if let Err(e) = dispatcher.await {
            error!("dispatcher task failed: {:?}", e);
        }

        let topic = self.response_topic();
        self.inner.transport.unsubscribe(topic).await?;
        info!("Unsubscribed from {}", topic);
        Ok(())
    }

    async fn leaf(
        &self,
        request: Request,
    ) -> Result<Bytes> {
        match self.execute(request).await? {
            Response::Leaf(payload) => Ok(payload),
            other => Err(Error::Fatal(format!("leaf request answered with {other:?}"))),
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("prefix", &self.inner.prefix)
            .field("response_topic", &self.response_topic())
            .field("closed", &self.is_closed())
            .finish()
    }
}
