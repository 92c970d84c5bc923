//! Device discovery through liveness beacons.
//!
//! Devices publish a retained beacon on `{prefix}/alive`. Discovery
//! subscribes to `{filter}/alive`, listens for a window calibrated on the
//! subscribe round-trip and reports every device that announced valid JSON
//! metadata in that window.


use std::collections::BTreeMap;
use std::sync::Arc;

use futures::Stream;
use futures::StreamExt;
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;
use tracing::info;

use crate::constants::ALIVE_SUFFIX;
use crate::topic_matches;
use crate::DiscoveryConfig;
use crate::DiscoveryError;
use crate::InboundMessage;
use crate::Result;
use crate::Transport;

pub struct DiscoveryService {
    transport: Arc<dyn Transport>,
    config: DiscoveryConfig,
}

impl DiscoveryService {
    pub fn new(
        transport: Arc<dyn Transport>,
        config: DiscoveryConfig,
    ) -> Self {
        Self { transport, config }
    }

    /// Collect the devices alive below `filter_prefix`, an MQTT topic filter
    /// such as `dt/sinara/stabilizer/+`.
    ///
    /// `inbound` must be the message stream of the transport's session. It is
    /// borrowed so it can be handed to a [`Client`](crate::Client) afterwards.
    /// The beacon subscription is removed before returning, also when
    /// listening fails.
    pub async fn discover<S>(
        &self,
        inbound: &mut S,
        filter_prefix: &str,
    ) -> Result<BTreeMap<String, Value>>
    where
        S: Stream<Item = InboundMessage> + Unpin,
    {
        self.config.validate()?;
        let filter = format!("{filter_prefix}{ALIVE_SUFFIX}");

        let start = Instant::now();
        self.transport.subscribe(&filter).await?;
        let window = self.config.window(start.elapsed());
        debug!("listening on {} for {:?}", filter, window);

        let mut discovered = BTreeMap::new();
        // Hitting the end of the window is the regular way out.
        let _ = tokio::time::timeout(window, Self::listen(inbound, &filter, &mut discovered)).await;

        self.transport.unsubscribe(&filter).await?;
        Ok(discovered)
    }

    /// Discover exactly one device.
    ///
    /// # Errors
    /// [`DiscoveryError::Ambiguous`] with everything found when zero or more
    /// than one device answered.
    pub async fn discover_one<S>(
        &self,
        inbound: &mut S,
        filter_prefix: &str,
    ) -> Result<(String, Value)>
    where
        S: Stream<Item = InboundMessage> + Unpin,
    {
        let mut discovered = self.discover(inbound, filter_prefix).await?;
        if discovered.len() == 1 {
            if let Some(device) = discovered.pop_first() {
                info!("Found device: {}", device.0);
                return Ok(device);
            }
        }
        Err(DiscoveryError::Ambiguous { found: discovered }.into())
    }

    async fn listen<S>(
        inbound: &mut S,
        filter: &str,
        discovered: &mut BTreeMap<String, Value>,
    ) where
        S: Stream<Item = InboundMessage> + Unpin,
    {
        while let Some(message) = inbound.next().await {
            if !topic_matches(filter, &message.topic) {
                debug!("discovery ignores message on {}", message.topic);
                continue;
            }
            let Some(peer) = message.topic.strip_suffix(ALIVE_SUFFIX) else {
                continue;
            };
            match serde_json::from_slice::<Value>(&message.payload) {
                Ok(metadata) => {
                    info!("Discovered {} alive", peer);
                    discovered.insert(peer.to_string(), metadata);
                }
                Err(_) => info!("Ignoring {} not/invalid alive", peer),
            }
        }
    }
}
