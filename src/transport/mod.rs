//! Abstract publish/subscribe capability consumed by the client.
//!
//! The client never talks to a broker directly. Anything that can subscribe,
//! unsubscribe and publish MQTT5-style messages (with correlation data,
//! response topic and user properties) can back it. Inbound traffic is handed
//! to the client separately as a [`futures::Stream`] of [`InboundMessage`]s,
//! so that discovery and the request dispatcher can share one connection.

pub mod memory;

pub use memory::*;


use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;

use crate::constants::CODE_PROPERTY;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Subscribe to {topic} failed: {reason}")]
    Subscribe { topic: String, reason: String },

    #[error("Unsubscribe from {topic} failed: {reason}")]
    Unsubscribe { topic: String, reason: String },

    #[error("Publish to {topic} failed: {reason}")]
    Publish { topic: String, reason: String },

    #[error("Transport disconnected")]
    Disconnected,
}

/// Out-of-band message metadata (MQTT5 publish properties)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageProperties {
    pub response_topic: Option<String>,
    pub correlation_data: Option<Bytes>,
    pub user_properties: Vec<(String, String)>,
}

impl MessageProperties {
    /// First user property value with the given name.
    pub fn user_property(
        &self,
        name: &str,
    ) -> Option<&str> {
        self.user_properties
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Status marker attached to a response.
    pub fn code(&self) -> Option<&str> {
        self.user_property(CODE_PROPERTY)
    }

    pub fn with_code(
        mut self,
        code: &str,
    ) -> Self {
        self.user_properties.push((CODE_PROPERTY.to_string(), code.to_string()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Bytes,
    pub retain: bool,
    pub properties: MessageProperties,
}

impl InboundMessage {
    pub fn new(
        topic: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retain: false,
            properties: MessageProperties::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    pub payload: Bytes,
    pub retain: bool,
    pub properties: MessageProperties,
}

impl OutboundMessage {
    pub fn new(
        topic: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retain: false,
            properties: MessageProperties::default(),
        }
    }

    pub fn retain(
        mut self,
        retain: bool,
    ) -> Self {
        self.retain = retain;
        self
    }

    /// Ask the peer to answer on `response_topic`, echoing `correlation_data`.
    pub fn reply_to(
        mut self,
        response_topic: impl Into<String>,
        correlation_data: impl Into<Bytes>,
    ) -> Self {
        self.properties.response_topic = Some(response_topic.into());
        self.properties.correlation_data = Some(correlation_data.into());
        self
    }

    pub fn properties(
        mut self,
        properties: MessageProperties,
    ) -> Self {
        self.properties = properties;
        self
    }
}

/// Publish/subscribe primitives of a connected client.
///
/// All methods resolve once the broker acknowledged the operation.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn subscribe(
        &self,
        topic_filter: &str,
    ) -> std::result::Result<(), TransportError>;

    async fn unsubscribe(
        &self,
        topic_filter: &str,
    ) -> std::result::Result<(), TransportError>;

    async fn publish(
        &self,
        message: OutboundMessage,
    ) -> std::result::Result<(), TransportError>;
}
