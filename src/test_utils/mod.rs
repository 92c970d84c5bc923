//! Shared fixtures for unit tests: a simulated device speaking the settings
//! protocol over the in-process broker, and message builders.
mod mock_device;

pub(crate) use mock_device::*;

use bytes::Bytes;

use crate::CorrelationToken;
use crate::InboundMessage;
use crate::MessageProperties;

pub(crate) const TEST_PREFIX: &str = "dt/sinara/dev1";
pub(crate) const TEST_RESPONSE_TOPIC: &str = "dt/sinara/dev1/response";

/// Response part as a device would send it.
pub(crate) fn response(
    token: &CorrelationToken,
    code: &str,
    payload: &'static str,
) -> InboundMessage {
    InboundMessage {
        properties: MessageProperties {
            correlation_data: Some(token.clone().into_bytes()),
            ..Default::default()
        }
        .with_code(code),
        ..InboundMessage::new(TEST_RESPONSE_TOPIC, Bytes::from_static(payload.as_bytes()))
    }
}
