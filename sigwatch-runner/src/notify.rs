//! Alert delivery.

use std::io::Write;

use tracing::warn;

/// Fire-and-forget message sink.
///
/// Delivery failures stay inside the notifier; the monitor never retries.
pub trait Notifier: Send + Sync {
    fn notify(&self, destination: &str, message: &str);
}

/// Writes alerts to standard output, one block per alert.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn notify(&self, destination: &str, message: &str) {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        if let Err(e) = writeln!(out, "[{destination}]\n{message}\n") {
            warn!(destination, error = %e, "failed to write alert");
        }
    }
}
