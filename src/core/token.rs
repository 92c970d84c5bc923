use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use bytes::Bytes;

/// Opaque request identifier echoed by the device in every response part.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CorrelationToken(Bytes);

impl CorrelationToken {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<Bytes> for CorrelationToken {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<&'static str> for CorrelationToken {
    fn from(s: &'static str) -> Self {
        Self(Bytes::from_static(s.as_bytes()))
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for CorrelationToken {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "CorrelationToken({self})")
    }
}

/// Issues tokens unique within one client instance.
///
/// The random salt keeps tokens of different clients sharing a response
/// topic apart; the counter makes them unique within this client.
pub(crate) struct TokenGenerator {
    salt: String,
    seq: AtomicU64,
}

impl TokenGenerator {
    pub(crate) fn new() -> Self {
        Self {
            salt: nanoid::nanoid!(10),
            seq: AtomicU64::new(0),
        }
    }

    pub(crate) fn next_token(&self) -> CorrelationToken {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        CorrelationToken(Bytes::from(format!("{}-{:x}", self.salt, seq)))
    }
}
