//! Single consumer of the inbound message stream.
//!
//! Every message received on the client connection passes through
//! [`Dispatcher::dispatch`], which routes it by correlation token to the
//! pending request it answers. Traffic that can not be routed (foreign topic,
//! no correlation data or status code, unknown token) is dropped: on a shared
//! broker such messages are expected and never an error for the caller.

use std::sync::Arc;

use futures::Stream;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::CorrelationRegistry;
use super::EnvelopeError;
use super::ResponseCode;
use super::ResponseEnvelope;
use crate::InboundMessage;
use crate::RequestError;

/// What happened to one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Dispatch {
    /// Continuation part stored, request still pending
    Appended,
    /// Request resolved with its parts
    Completed,
    /// Request resolved with a device error
    Failed,
    Discarded(Discard),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Discard {
    UnexpectedTopic,
    Undecodable(EnvelopeError),
    Unmatched,
}

pub(crate) struct Dispatcher {
    registry: Arc<CorrelationRegistry>,
    response_topic: String,
}

impl Dispatcher {
    pub(crate) fn new(
        registry: Arc<CorrelationRegistry>,
        response_topic: String,
    ) -> Self {
        Self {
            registry,
            response_topic,
        }
    }

    pub(crate) fn spawn<S>(
        self,
        inbound: S,
        shutdown: CancellationToken,
    ) -> JoinHandle<()>
    where
        S: Stream<Item = InboundMessage> + Send + Unpin + 'static,
    {
        tokio::spawn(self.run(inbound, shutdown))
    }

    /// Consume `inbound` until `shutdown` fires or the stream ends, then
    /// cancel whatever is still in flight.
    pub(crate) async fn run<S>(
        self,
        mut inbound: S,
        shutdown: CancellationToken,
    ) where
        S: Stream<Item = InboundMessage> + Unpin,
    {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("dispatcher for {} shutting down", self.response_topic);
                    break;
                }
                next = inbound.next() => match next {
                    Some(message) => {
                        self.dispatch(message);
                    }
                    None => {
                        warn!("inbound stream ended, dispatcher for {} stops", self.response_topic);
                        shutdown.cancel();
                        break;
                    }
                }
            }
        }

        let pending = self.registry.drain();
        if !pending.is_empty() {
            info!("cancelling {} in-flight requests", pending.len());
        }
        for request in pending {
            request.cancel();
        }
    }

    pub(crate) fn dispatch(
        &self,
        message: InboundMessage,
    ) -> Dispatch {
        if message.topic != self.response_topic {
            warn!("Discarding message with unexpected topic: {}", message.topic);
            return Dispatch::Discarded(Discard::UnexpectedTopic);
        }
        debug!(
            "Received {}: {:?} [{:?}]",
            message.topic, message.payload, message.properties
        );

        let envelope = match ResponseEnvelope::try_from(message) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!("Discarding undecodable response: {}", e);
                return Dispatch::Discarded(Discard::Undecodable(e));
            }
        };

        let ResponseEnvelope {
            token, code, payload, ..
        } = envelope;

        match code {
            ResponseCode::Continue => match self.registry.lookup(&token) {
                Some(mut pending) => {
                    pending.push(payload);
                    Dispatch::Appended
                }
                None => {
                    debug!("Discarding response with unexpected correlation data: {}", token);
                    Dispatch::Discarded(Discard::Unmatched)
                }
            },
            ResponseCode::Ok => {
                let Some(mut pending) = self.registry.remove(&token) else {
                    debug!("Discarding response with unexpected correlation data: {}", token);
                    return Dispatch::Discarded(Discard::Unmatched);
                };
                if !payload.is_empty() {
                    pending.push(payload);
                }
                pending.succeed();
                Dispatch::Completed
            }
            ResponseCode::Error(code) => {
                let Some(pending) = self.registry.remove(&token) else {
                    debug!("Discarding response with unexpected correlation data: {}", token);
                    return Dispatch::Discarded(Discard::Unmatched);
                };
                pending.fail(RequestError::Protocol {
                    code,
                    message: String::from_utf8_lossy(&payload).into_owned(),
                });
                Dispatch::Failed
            }
        }
    }
}
