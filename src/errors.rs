//! Error hierarchy for the settings client
//!
//! Errors are grouped by the layer that produces them: request correlation,
//! peer discovery, the external transport, and payload decoding.

use std::collections::BTreeMap;
use std::time::Duration;

use config::ConfigError;

use crate::TransportError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failures of an individual request/response exchange
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Failures to settle on a peer during discovery
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Connect/publish/subscribe failures, propagated unchanged
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Leaf payload could not be encoded or decoded
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Configuration source could not be loaded or deserialized
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Settings path that can not be mapped onto a topic
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Command that does not follow the `PATH[=VALUE|?|!]` grammar
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Broken internal invariant
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// A leaf request was answered with zero or several parts
    #[error("Not a leaf: {parts:?}")]
    NotALeaf { parts: Vec<String> },

    /// Terminal status other than `Ok`; the code is carried as sent by the device
    #[error("{code}: {message}")]
    Protocol { code: String, message: String },

    #[error("No response within {0:?}")]
    Timeout(Duration),

    /// The client shut down (or lost its inbound stream) before the request completed
    #[error("Request cancelled")]
    Cancelled,

    /// A multi-part request terminated without a single part
    #[error("Empty response")]
    EmptyResponse,
}

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("No unique Miniconf device (found {found:?})")]
    Ambiguous {
        found: BTreeMap<String, serde_json::Value>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Codec(CodecError::Json(e))
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Error::Codec(CodecError::Utf8(e))
    }
}

impl Error {
    /// Returns the request-level failure, if this error is one.
    pub fn as_request(&self) -> Option<&RequestError> {
        match self {
            Error::Request(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Request(RequestError::Cancelled))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Request(RequestError::Timeout(_)))
    }
}
