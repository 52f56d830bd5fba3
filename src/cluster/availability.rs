use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Duration;

#[derive(Clone, Copy, Debug, thiserror::Error)]
#[error("Database was unavailable for longer than {}ms", .waited.as_millis())]
pub struct Unavailable {
    pub waited: Duration,
}

/// AvailabilityGuard answers "may we do work right now?" with a bounded wait.
/// The database lifecycle (startup, store copy, shutdown) flips availability;
/// replication must not hang forever on an unavailable database.
#[async_trait]
pub trait AvailabilityGuard: Send + Sync {
    /// Wait until the database is available, up to `timeout`.
    async fn await_available(&self, timeout: Duration) -> Result<(), Unavailable>;
}

/// Watch-backed availability switch. Whoever owns the database lifecycle
/// flips it; any number of waiters observe the change.
pub struct AvailabilityFlag {
    sender: watch::Sender<bool>,
}

impl AvailabilityFlag {
    pub fn new(initially_available: bool) -> Self {
        let (sender, _) = watch::channel(initially_available);
        AvailabilityFlag { sender }
    }

    pub fn set_available(&self, available: bool) {
        let _ = self.sender.send(available);
    }

    pub fn is_available(&self) -> bool {
        *self.sender.borrow()
    }
}

#[async_trait]
impl AvailabilityGuard for AvailabilityFlag {
    async fn await_available(&self, timeout: Duration) -> Result<(), Unavailable> {
        let mut receiver = self.sender.subscribe();
        let result = tokio::time::timeout(timeout, receiver.wait_for(|available| *available)).await;
        match result {
            Ok(Ok(_)) => Ok(()),
            // Channel closure means the flag itself is gone; treat as unavailable.
            Ok(Err(_)) | Err(_) => Err(Unavailable { waited: timeout }),
        }
    }
}
