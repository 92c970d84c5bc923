use tokio::time::Instant;
use tracing::trace;

/// Traces how long a client operation on a settings path took, once the
/// enclosing scope ends. Also covers the error and cancellation exits.
pub(crate) struct ScopedTimer<'a> {
    start: Instant,
    operation: &'static str,
    path: &'a str,
}

impl<'a> ScopedTimer<'a> {
    pub(crate) fn new(
        operation: &'static str,
        path: &'a str,
    ) -> Self {
        Self {
            start: Instant::now(),
            operation,
            path,
        }
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        trace!(
            target: "miniconf_mqtt_client::timing",
            "{} {} took {:?}",
            self.operation,
            self.path,
            self.start.elapsed()
        );
    }
}
