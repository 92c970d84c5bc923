//! Issuing requests and waiting for their correlated responses.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::info;

use super::Completion;
use super::CorrelationRegistry;
use super::CorrelationToken;
use super::PendingRequest;
use super::TokenGenerator;
use crate::constants::SEPARATOR;
use crate::constants::SETTINGS_SUFFIX;
use crate::Error;
use crate::OutboundMessage;
use crate::RequestError;
use crate::Result;
use crate::Transport;

/// How many response parts a request expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Fire and forget: publish without asking for a response
    None,
    /// Exactly one part
    Leaf,
    /// One or more parts, returned in arrival order
    Multipart,
}

#[derive(Debug, Clone)]
pub struct Request {
    /// Settings path, empty or starting with the separator
    pub path: String,
    pub payload: Bytes,
    pub mode: ResponseMode,
    /// Ask the broker to retain the published request
    pub retain: bool,
    /// Overrides the client's default request timeout
    pub timeout: Option<Duration>,
}

impl Request {
    pub fn new(
        path: impl Into<String>,
        mode: ResponseMode,
    ) -> Self {
        Self {
            path: path.into(),
            payload: Bytes::new(),
            mode,
            retain: false,
            timeout: None,
        }
    }

    pub fn payload(
        mut self,
        payload: impl Into<Bytes>,
    ) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn retain(
        mut self,
        retain: bool,
    ) -> Self {
        self.retain = retain;
        self
    }

    pub fn timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// No response was requested
    None,
    Leaf(Bytes),
    Parts(Vec<Bytes>),
}

pub(crate) struct RequestExecutor {
    transport: Arc<dyn Transport>,
    registry: Arc<CorrelationRegistry>,
    tokens: TokenGenerator,
    settings_prefix: String,
    response_topic: String,
    default_timeout: Option<Duration>,
}

impl RequestExecutor {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        registry: Arc<CorrelationRegistry>,
        prefix: &str,
        response_topic: String,
        default_timeout: Option<Duration>,
    ) -> Self {
        Self {
            transport,
            registry,
            tokens: TokenGenerator::new(),
            settings_prefix: format!("{prefix}{SETTINGS_SUFFIX}"),
            response_topic,
            default_timeout,
        }
    }

    pub(crate) fn response_topic(&self) -> &str {
        &self.response_topic
    }

    pub(crate) async fn execute(
        &self,
        request: Request,
    ) -> Result<Response> {
        validate_path(&request.path)?;

        let topic = format!("{}{}", self.settings_prefix, request.path);
        let mut message = OutboundMessage::new(topic, request.payload).retain(request.retain);

        // Register before publishing: the response may overtake the publish ack.
        let inflight = match request.mode {
            ResponseMode::None => None,
            ResponseMode::Leaf | ResponseMode::Multipart => {
                let token = self.tokens.next_token();
                let (pending, rx) = PendingRequest::new(token.clone());
                self.registry.insert(pending)?;
                message = message.reply_to(self.response_topic.clone(), token.clone().into_bytes());
                Some((
                    Inflight {
                        registry: &self.registry,
                        token,
                    },
                    rx,
                ))
            }
        };

        info!(
            "Publishing {}: {:?} [{:?}]",
            message.topic, message.payload, message.properties
        );
        self.transport.publish(message).await?;

        let Some((inflight, rx)) = inflight else {
            return Ok(Response::None);
        };
        let parts = inflight
            .wait(rx, request.timeout.or(self.default_timeout))
            .await?;

        match request.mode {
            ResponseMode::Multipart if parts.is_empty() => Err(RequestError::EmptyResponse.into()),
            ResponseMode::Multipart => Ok(Response::Parts(parts)),
            _ => into_leaf(parts).map(Response::Leaf),
        }
    }
}

/// Registry entry of one request; removed on drop if still present.
///
/// Covers the timeout path as well as callers dropping the request future.
struct Inflight<'a> {
    registry: &'a CorrelationRegistry,
    token: CorrelationToken,
}

impl Inflight<'_> {
    async fn wait(
        &self,
        rx: oneshot::Receiver<Completion>,
        timeout: Option<Duration>,
    ) -> Result<Vec<Bytes>> {
        let completion = match timeout {
            Some(duration) => match tokio::time::timeout(duration, rx).await {
                Ok(completion) => completion,
                Err(_) => {
                    debug!("request {} timed out after {:?}", self.token, duration);
                    return Err(RequestError::Timeout(duration).into());
                }
            },
            None => rx.await,
        };

        match completion {
            Ok(Ok(parts)) => Ok(parts),
            Ok(Err(e)) => Err(e.into()),
            // Sender dropped without a result: the engine went away.
            Err(_) => Err(RequestError::Cancelled.into()),
        }
    }
}

impl Drop for Inflight<'_> {
    fn drop(&mut self) {
        if self.registry.remove(&self.token).is_some() {
            debug!("request {} abandoned", self.token);
        }
    }
}

fn into_leaf(mut parts: Vec<Bytes>) -> Result<Bytes> {
    match parts.pop() {
        Some(part) if parts.is_empty() => Ok(part),
        other => {
            parts.extend(other);
            Err(RequestError::NotALeaf {
                parts: parts
                    .iter()
                    .map(|p| String::from_utf8_lossy(p).into_owned())
                    .collect(),
            }
            .into())
        }
    }
}

fn validate_path(path: &str) -> Result<()> {
    if !path.is_empty() && !path.starts_with(SEPARATOR) {
        return Err(Error::InvalidPath(format!(
            "{path:?} is neither empty nor starts with {SEPARATOR:?}"
        )));
    }
    if path.contains(['+', '#']) {
        return Err(Error::InvalidPath(format!("{path:?} contains topic wildcards")));
    }
    Ok(())
}
