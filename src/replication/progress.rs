use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, Semaphore};
use tokio::time::Duration;

/// Outcome of applying one replicated operation, delivered by the applying
/// side once consensus has been reached and the state machine has run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OperationOutcome {
    Applied(Bytes),
    Failed(String),
}

/// Progress tracks one in-flight operation: whether the cluster has accepted
/// it, and the eventual applied result.
///
/// The wake signal is a counting semaphore rather than a condvar-and-flag:
/// the replication signal can race ahead of the submitting task's first
/// wait, and that permit must not be lost. Spurious extra permits are
/// harmless; the waiter re-reads the flag after every wake-up.
pub struct Progress {
    replicated: AtomicBool,
    signal: Semaphore,
    result_sender: Mutex<Option<oneshot::Sender<OperationOutcome>>>,
}

impl Progress {
    pub(crate) fn new() -> (Arc<Progress>, oneshot::Receiver<OperationOutcome>) {
        let (sender, receiver) = oneshot::channel();
        let progress = Arc::new(Progress {
            replicated: AtomicBool::new(false),
            signal: Semaphore::new(0),
            result_sender: Mutex::new(Some(sender)),
        });
        (progress, receiver)
    }

    pub fn is_replicated(&self) -> bool {
        self.replicated.load(Ordering::Acquire)
    }

    /// Mark the operation as accepted by the cluster and wake the waiter.
    /// Idempotent; redelivered signals land here too.
    pub(crate) fn set_replicated(&self) {
        self.replicated.store(true, Ordering::Release);
        self.signal.add_permits(1);
    }

    /// Wake the waiter without marking anything, so it re-evaluates its
    /// world (leader identity, availability) ahead of its timeout.
    pub(crate) fn trigger_replication_event(&self) {
        self.signal.add_permits(1);
    }

    /// Wait up to `timeout` for a replication signal. Returns the replicated
    /// flag as of wake-up; the caller decides whether to resend.
    pub async fn await_replication(&self, timeout: Duration) -> bool {
        if self.is_replicated() {
            return true;
        }
        if let Ok(Ok(permit)) = tokio::time::timeout(timeout, self.signal.acquire()).await {
            permit.forget();
        }
        self.is_replicated()
    }

    /// Deliver the applied result. The first call wins; anything later finds
    /// the sender gone and is a no-op.
    pub(crate) fn complete(&self, outcome: OperationOutcome) {
        let sender = self
            .result_sender
            .lock()
            .expect("Progress.complete() mutex guard poison")
            .take();
        if let Some(sender) = sender {
            // Receiver may have been dropped by an uninterested caller.
            let _ = sender.send(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn await_returns_immediately_when_already_replicated() {
        let (progress, _receiver) = Progress::new();
        progress.set_replicated();

        assert!(progress.await_replication(Duration::from_millis(1)).await);
    }

    #[tokio::test]
    async fn signal_before_wait_is_not_lost() {
        let (progress, _receiver) = Progress::new();

        // Signal first, wait second. A condvar-and-flag design drops this.
        progress.set_replicated();
        assert!(progress.await_replication(Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn wait_times_out_when_nothing_happens() {
        let (progress, _receiver) = Progress::new();
        assert!(!progress.await_replication(Duration::from_millis(5)).await);
    }

    #[tokio::test]
    async fn trigger_wakes_waiter_without_marking_replicated() {
        let (progress, _receiver) = Progress::new();

        let waiter = {
            let progress = Arc::clone(&progress);
            tokio::task::spawn(
                async move { progress.await_replication(Duration::from_secs(30)).await },
            )
        };

        // Give the waiter a chance to block first.
        tokio::task::yield_now().await;
        progress.trigger_replication_event();

        assert!(!waiter.await.expect("waiter task panicked"));
    }

    #[tokio::test]
    async fn complete_resolves_result_once() {
        let (progress, receiver) = Progress::new();

        progress.complete(OperationOutcome::Applied(Bytes::from_static(b"ok")));
        progress.complete(OperationOutcome::Failed("too late".into()));

        assert_eq!(
            OperationOutcome::Applied(Bytes::from_static(b"ok")),
            receiver.await.expect("result should be delivered")
        );
    }
}
