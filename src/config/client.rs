use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::RESPONSE_SUFFIX;
use crate::Error;
use crate::Result;

/// Request/response settings of a [`Client`](crate::Client)
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    /// Topic on which the device is asked to respond
    /// Default: `{prefix}/response`
    #[serde(default)]
    pub response_topic: Option<String>,

    /// Maximum time to wait for the terminal response of a request
    /// Default: none (wait until answered or the client closes)
    #[serde(default)]
    pub request_timeout_in_ms: Option<u64>,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(topic) = &self.response_topic {
            if topic.is_empty() {
                return Err(Error::InvalidConfig("response_topic cannot be empty".into()));
            }
            if topic.contains(['+', '#']) {
                return Err(Error::InvalidConfig(format!(
                    "response_topic {topic} must not contain wildcards"
                )));
            }
        }

        if self.request_timeout_in_ms == Some(0) {
            return Err(Error::InvalidConfig(
                "request_timeout_in_ms must be positive when set".into(),
            ));
        }
        Ok(())
    }

    /// Response topic to use for a device at `prefix`.
    pub fn response_topic_for(
        &self,
        prefix: &str,
    ) -> String {
        self.response_topic
            .clone()
            .unwrap_or_else(|| format!("{prefix}{RESPONSE_SUFFIX}"))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_in_ms.map(Duration::from_millis)
    }
}
