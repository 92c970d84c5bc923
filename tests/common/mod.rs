use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use miniconf_mqtt_client::MemoryBroker;
use miniconf_mqtt_client::MessageProperties;
use miniconf_mqtt_client::OutboundMessage;
use miniconf_mqtt_client::Transport;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;

pub const DEVICE_PREFIX: &str = "dt/sinara/stabilizer/00-11-22-33-44-55";
pub const DISCOVERY_FILTER: &str = "dt/sinara/stabilizer/+";

/// Settings device answering get, set and list requests.
pub struct Device {
    pub leaves: Arc<Mutex<BTreeMap<String, Value>>>,
    task: JoinHandle<()>,
}

impl Device {
    pub async fn start(
        broker: &MemoryBroker,
        leaves: &[(&str, Value)],
    ) -> Self {
        let leaves: BTreeMap<String, Value> = leaves.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        let leaves = Arc::new(Mutex::new(leaves));
        let (session, mut inbound) = broker.connect();
        let settings = format!("{DEVICE_PREFIX}/settings");
        session.subscribe(&format!("{settings}/#")).await.unwrap();
        session
            .publish(OutboundMessage::new(format!("{DEVICE_PREFIX}/alive"), "1").retain(true))
            .await
            .unwrap();

        let state = leaves.clone();
        let task = tokio::spawn(async move {
            while let Some(request) = inbound.next().await {
                let Some(response_topic) = request.properties.response_topic.clone() else {
                    continue;
                };
                let path = request.topic.strip_prefix(&settings).unwrap_or_default().to_string();
                let properties = |code: &str| {
                    MessageProperties {
                        correlation_data: request.properties.correlation_data.clone(),
                        ..Default::default()
                    }
                    .with_code(code)
                };

                let mut replies = vec![];
                {
                    let mut leaves = state.lock();
                    if !request.payload.is_empty() {
                        let value: Value = serde_json::from_slice(&request.payload).unwrap();
                        leaves.insert(path, value);
                        replies.push(("Ok", Bytes::from_static(b"OK")));
                    } else if let Some(value) = leaves.get(&path) {
                        replies.push(("Ok", Bytes::from(value.to_string())));
                    } else {
                        for leaf in leaves.keys().filter(|l| l.starts_with(&format!("{path}/"))) {
                            replies.push(("Continue", Bytes::from(leaf.clone())));
                        }
                        replies.push(("Ok", Bytes::new()));
                    }
                }
                for (code, payload) in replies {
                    let reply = OutboundMessage::new(response_topic.clone(), payload).properties(properties(code));
                    session.publish(reply).await.unwrap();
                }
            }
        });

        Self { leaves, task }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.task.abort();
    }
}
