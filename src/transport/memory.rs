//! In-process broker implementing [`Transport`]
//!
//! Routes publishes to every other connected session holding a matching
//! topic filter (`+` single level, `#` trailing multi level), keeps retained
//! messages (an empty retained payload clears the slot) and replays them on
//! subscribe. Sessions never receive their own publishes (MQTT5 "no local").

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;
use tracing::trace;

use super::InboundMessage;
use super::OutboundMessage;
use super::Transport;
use super::TransportError;

/// Inbound side of a [`MemoryClient`] session.
pub type MemoryInbound = UnboundedReceiverStream<InboundMessage>;

struct Session {
    filters: HashSet<String>,
    tx: mpsc::UnboundedSender<InboundMessage>,
}

#[derive(Default)]
struct BrokerState {
    next_session: u64,
    sessions: HashMap<u64, Session>,
    retained: BTreeMap<String, InboundMessage>,
}

#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new session on the broker.
    pub fn connect(&self) -> (MemoryClient, MemoryInbound) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        let id = state.next_session;
        state.next_session += 1;
        state.sessions.insert(
            id,
            Session {
                filters: HashSet::new(),
                tx,
            },
        );
        debug!("memory broker: session {} connected", id);

        (
            MemoryClient {
                id,
                broker: self.clone(),
            },
            UnboundedReceiverStream::new(rx),
        )
    }

    /// Currently retained message on `topic`, if any.
    pub fn retained(
        &self,
        topic: &str,
    ) -> Option<InboundMessage> {
        self.state.lock().retained.get(topic).cloned()
    }

    /// Number of sessions with at least one filter matching `topic`.
    pub fn subscriber_count(
        &self,
        topic: &str,
    ) -> usize {
        self.state
            .lock()
            .sessions
            .values()
            .filter(|s| s.filters.iter().any(|f| topic_matches(f, topic)))
            .count()
    }
}

/// One session on a [`MemoryBroker`]. Dropping it disconnects.
pub struct MemoryClient {
    id: u64,
    broker: MemoryBroker,
}

impl MemoryClient {
    /// Drop the session; its inbound stream terminates.
    pub fn disconnect(&self) {
        if self.broker.state.lock().sessions.remove(&self.id).is_some() {
            debug!("memory broker: session {} disconnected", self.id);
        }
    }
}

impl Drop for MemoryClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[async_trait]
impl Transport for MemoryClient {
    async fn subscribe(
        &self,
        topic_filter: &str,
    ) -> std::result::Result<(), TransportError> {
        if !is_valid_filter(topic_filter) {
            return Err(TransportError::Subscribe {
                topic: topic_filter.to_string(),
                reason: "malformed topic filter".to_string(),
            });
        }

        let mut state = self.broker.state.lock();
        let BrokerState {
            sessions, retained, ..
        } = &mut *state;
        let session = sessions.get_mut(&self.id).ok_or(TransportError::Disconnected)?;
        session.filters.insert(topic_filter.to_string());

        for (topic, message) in retained.iter() {
            if topic_matches(topic_filter, topic) {
                trace!("memory broker: replay retained {}", topic);
                let _ = session.tx.send(message.clone());
            }
        }
        Ok(())
    }

    async fn unsubscribe(
        &self,
        topic_filter: &str,
    ) -> std::result::Result<(), TransportError> {
        let mut state = self.broker.state.lock();
        let session = state
            .sessions
            .get_mut(&self.id)
            .ok_or(TransportError::Disconnected)?;
        session.filters.remove(topic_filter);
        Ok(())
    }

    async fn publish(
        &self,
        message: OutboundMessage,
    ) -> std::result::Result<(), TransportError> {
        if message.topic.is_empty() || message.topic.contains(['+', '#']) {
            return Err(TransportError::Publish {
                topic: message.topic,
                reason: "topic name must be non-empty and free of wildcards".to_string(),
            });
        }

        let mut state = self.broker.state.lock();
        if !state.sessions.contains_key(&self.id) {
            return Err(TransportError::Disconnected);
        }

        let inbound = InboundMessage {
            topic: message.topic.clone(),
            payload: message.payload.clone(),
            retain: false,
            properties: message.properties.clone(),
        };

        if message.retain {
            if message.payload.is_empty() {
                state.retained.remove(&message.topic);
            } else {
                state.retained.insert(
                    message.topic.clone(),
                    InboundMessage {
                        retain: true,
                        ..inbound.clone()
                    },
                );
            }
        }

        for (id, session) in state.sessions.iter() {
            if *id == self.id || !session.filters.iter().any(|f| topic_matches(f, &message.topic)) {
                continue;
            }
            // A session whose stream was dropped simply misses the message.
            let _ = session.tx.send(inbound.clone());
        }
        Ok(())
    }
}

fn is_valid_filter(filter: &str) -> bool {
    if filter.is_empty() {
        return false;
    }
    let levels: Vec<&str> = filter.split('/').collect();
    levels.iter().enumerate().all(|(i, level)| match *level {
        "#" => i == levels.len() - 1,
        "+" => true,
        other => !other.contains(['+', '#']),
    })
}

/// MQTT topic filter matching.
pub fn topic_matches(
    filter: &str,
    topic: &str,
) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
