//! Outstanding requests keyed by correlation token.
//!
//! The executor inserts an entry before it publishes; the dispatcher appends
//! parts and takes the entry out when a terminal status arrives. Completing a
//! [`PendingRequest`] consumes it, so a request can be resolved only once.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::debug;

use super::CorrelationToken;
use crate::Error;
use crate::RequestError;
use crate::Result;

/// Terminal result delivered to the awaiting requester.
pub(crate) type Completion = std::result::Result<Vec<Bytes>, RequestError>;

#[derive(Debug)]
pub(crate) struct PendingRequest {
    token: CorrelationToken,
    parts: Vec<Bytes>,
    completion: oneshot::Sender<Completion>,
}

impl PendingRequest {
    pub(crate) fn new(token: CorrelationToken) -> (Self, oneshot::Receiver<Completion>) {
        let (completion, rx) = oneshot::channel();
        (
            Self {
                token,
                parts: Vec::new(),
                completion,
            },
            rx,
        )
    }

    pub(crate) fn token(&self) -> &CorrelationToken {
        &self.token
    }

    #[cfg(test)]
    pub(crate) fn parts(&self) -> &[Bytes] {
        &self.parts
    }

    pub(crate) fn push(
        &mut self,
        part: Bytes,
    ) {
        self.parts.push(part);
    }

    pub(crate) fn succeed(mut self) {
        let parts = std::mem::take(&mut self.parts);
        self.finish(Ok(parts));
    }

    pub(crate) fn fail(
        self,
        error: RequestError,
    ) {
        self.finish(Err(error));
    }

    pub(crate) fn cancel(self) {
        self.fail(RequestError::Cancelled);
    }

    fn finish(
        self,
        completion: Completion,
    ) {
        // The requester may already have given up (timeout, dropped future).
        if self.completion.send(completion).is_err() {
            debug!("requester of {} is gone, dropping result", self.token);
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct CorrelationRegistry {
    inflight: DashMap<CorrelationToken, PendingRequest>,
    closed: AtomicBool,
}

impl CorrelationRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a request.
    ///
    /// A token collision is an invariant violation and reported as
    /// [`Error::Fatal`]. Once the registry is drained no new request is
    /// accepted: the pending request is cancelled and `Cancelled` returned.
    pub(crate) fn insert(
        &self,
        pending: PendingRequest,
    ) -> Result<()> {
        if self.is_closed() {
            pending.cancel();
            return Err(RequestError::Cancelled.into());
        }

        let token = pending.token().clone();
        match self.inflight.entry(token.clone()) {
            Entry::Occupied(_) => {
                return Err(Error::Fatal(format!("correlation token {token} already in flight")));
            }
            Entry::Vacant(slot) => {
                slot.insert(pending);
            }
        }

        // A concurrent drain may have missed the entry we just added.
        if self.is_closed() {
            if let Some(pending) = self.remove(&token) {
                pending.cancel();
            }
            return Err(RequestError::Cancelled.into());
        }
        Ok(())
    }

    pub(crate) fn lookup(
        &self,
        token: &CorrelationToken,
    ) -> Option<RefMut<'_, CorrelationToken, PendingRequest>> {
        self.inflight.get_mut(token)
    }

    pub(crate) fn remove(
        &self,
        token: &CorrelationToken,
    ) -> Option<PendingRequest> {
        self.inflight.remove(token).map(|(_, pending)| pending)
    }

    /// Close the registry and take every outstanding request out of it.
    pub(crate) fn drain(&self) -> Vec<PendingRequest> {
        self.closed.store(true, Ordering::SeqCst);
        let tokens: Vec<CorrelationToken> = self.inflight.iter().map(|e| e.key().clone()).collect();
        tokens.iter().filter_map(|token| self.remove(token)).collect()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inflight.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.inflight.is_empty()
    }
}
