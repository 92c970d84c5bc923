//! Decoding of inbound transport messages into response envelopes.

use bytes::Bytes;

use super::CorrelationToken;
use crate::constants::CODE_CONTINUE;
use crate::constants::CODE_OK;
use crate::InboundMessage;

/// Status marker of a response part
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// Partial result, more parts follow
    Continue,
    /// Terminal success
    Ok,
    /// Any other marker: terminal failure carrying the marker verbatim
    Error(String),
}

impl From<&str> for ResponseCode {
    fn from(code: &str) -> Self {
        match code {
            CODE_CONTINUE => ResponseCode::Continue,
            CODE_OK => ResponseCode::Ok,
            other => ResponseCode::Error(other.to_string()),
        }
    }
}

impl ResponseCode {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResponseCode::Continue)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub topic: String,
    pub token: CorrelationToken,
    pub code: ResponseCode,
    pub payload: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("message carries no correlation data")]
    MissingCorrelation,

    #[error("message carries no response code")]
    MissingCode,
}

impl TryFrom<InboundMessage> for ResponseEnvelope {
    type Error = EnvelopeError;

    fn try_from(message: InboundMessage) -> std::result::Result<Self, Self::Error> {
        let code = message
            .properties
            .code()
            .map(ResponseCode::from)
            .ok_or(EnvelopeError::MissingCode);
        let token = message
            .properties
            .correlation_data
            .map(CorrelationToken::from)
            .ok_or(EnvelopeError::MissingCorrelation)?;

        Ok(Self {
            topic: message.topic,
            token,
            code: code?,
            payload: message.payload,
        })
    }
}
