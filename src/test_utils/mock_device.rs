use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::constants::ALIVE_SUFFIX;
use crate::constants::CODE_CONTINUE;
use crate::constants::CODE_ERROR;
use crate::constants::CODE_OK;
use crate::constants::SETTINGS_SUFFIX;
use crate::InboundMessage;
use crate::MemoryBroker;
use crate::MemoryClient;
use crate::MessageProperties;
use crate::OutboundMessage;
use crate::Transport;

/// Device side of the settings protocol, serving a flat map of leaf paths.
///
/// - empty payload on a leaf: answer `Ok` with the JSON value
/// - empty payload on an internal node with a response topic: list the
///   leaves below it (`Continue` per path, then an empty `Ok`)
/// - empty payload on an internal node without response topic: dump every
///   leaf below it onto its settings topic
/// - non-empty payload: set the leaf and answer `Ok` with `OK`
pub(crate) struct MockDevice {
    leaves: Arc<Mutex<BTreeMap<String, Value>>>,
    client: Arc<MemoryClient>,
    prefix: String,
    task: JoinHandle<()>,
}

impl MockDevice {
    pub(crate) async fn spawn<'a>(
        broker: &MemoryBroker,
        prefix: &str,
        leaves: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Self {
        let leaves: BTreeMap<String, Value> = leaves.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        let leaves = Arc::new(Mutex::new(leaves));
        let (client, mut inbound) = broker.connect();
        let client = Arc::new(client);
        let settings_prefix = format!("{prefix}{SETTINGS_SUFFIX}");
        client.subscribe(&format!("{settings_prefix}/#")).await.unwrap();

        let task = {
            let leaves = leaves.clone();
            let client = client.clone();
            tokio::spawn(async move {
                while let Some(request) = inbound.next().await {
                    let replies = Self::handle(&settings_prefix, &leaves, request);
                    for reply in replies {
                        let _ = client.publish(reply).await;
                    }
                }
            })
        };

        Self {
            leaves,
            client,
            prefix: prefix.to_string(),
            task,
        }
    }

    pub(crate) fn value(
        &self,
        path: &str,
    ) -> Option<Value> {
        self.leaves.lock().get(path).cloned()
    }

    /// Publish a retained liveness beacon.
    pub(crate) async fn announce(&self) {
        self.client
            .publish(OutboundMessage::new(format!("{}{ALIVE_SUFFIX}", self.prefix), "1").retain(true))
            .await
            .unwrap();
    }

    fn handle(
        settings_prefix: &str,
        leaves: &Mutex<BTreeMap<String, Value>>,
        request: InboundMessage,
    ) -> Vec<OutboundMessage> {
        let Some(path) = request.topic.strip_prefix(settings_prefix) else {
            return vec![];
        };
        let reply_topic = request
            .properties
            .response_topic
            .clone()
            .unwrap_or_else(|| request.topic.clone());
        let reply = |code: &str, payload: Bytes| {
            OutboundMessage::new(reply_topic.clone(), payload).properties(
                MessageProperties {
                    correlation_data: request.properties.correlation_data.clone(),
                    ..Default::default()
                }
                .with_code(code),
            )
        };

        let mut leaves = leaves.lock();
        if !request.payload.is_empty() {
            return match leaves.get_mut(path) {
                Some(slot) => match serde_json::from_slice::<Value>(&request.payload) {
                    Ok(value) => {
                        *slot = value;
                        vec![reply(CODE_OK, Bytes::from_static(b"OK"))]
                    }
                    Err(e) => vec![reply(CODE_ERROR, Bytes::from(e.to_string()))],
                },
                None => vec![reply(CODE_ERROR, Bytes::from_static(b"Absent"))],
            };
        }

        if let Some(value) = leaves.get(path) {
            return vec![reply(CODE_OK, Bytes::from(value.to_string()))];
        }

        let below: Vec<(String, Value)> = leaves
            .iter()
            .filter(|(leaf, _)| leaf.starts_with(&format!("{path}/")))
            .map(|(leaf, value)| (leaf.clone(), value.clone()))
            .collect();
        if below.is_empty() {
            return vec![reply(CODE_ERROR, Bytes::from_static(b"Absent"))];
        }

        if request.properties.response_topic.is_some() {
            below
                .into_iter()
                .map(|(leaf, _)| reply(CODE_CONTINUE, Bytes::from(leaf)))
                .chain(std::iter::once(reply(CODE_OK, Bytes::new())))
                .collect()
        } else {
            below
                .into_iter()
                .map(|(leaf, value)| {
                    OutboundMessage::new(format!("{settings_prefix}{leaf}"), value.to_string())
                        .properties(MessageProperties::default().with_code(CODE_OK))
                })
                .collect()
        }
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.task.abort();
    }
}
