use crate::replication::operation::{DistributedOperation, GlobalSession, LocalOperationId};
use crate::replication::progress::{OperationOutcome, Progress};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::oneshot;

/// ProgressTracker is the registry of in-flight operations for one session.
///
/// The submitting task registers and (on failure) aborts; the applying side
/// delivers replication and result signals. The cluster redelivers signals,
/// so replication/result for an unknown operation (already finished or
/// aborted) or for a foreign session is expected and ignored.
pub struct ProgressTracker {
    logger: slog::Logger,
    session: GlobalSession,
    tracked: DashMap<LocalOperationId, Arc<Progress>>,
}

impl ProgressTracker {
    pub fn new(logger: slog::Logger, session: GlobalSession) -> Self {
        ProgressTracker {
            logger,
            session,
            tracked: DashMap::new(),
        }
    }

    pub fn session(&self) -> GlobalSession {
        self.session
    }

    /// Register a new operation. The operation must belong to this tracker's
    /// session and must not already be tracked; both are caller bugs, not
    /// network conditions.
    pub fn start(
        &self,
        operation: &DistributedOperation,
    ) -> (Arc<Progress>, oneshot::Receiver<OperationOutcome>) {
        assert_eq!(
            self.session, operation.global_session,
            "tracked an operation from a foreign session"
        );

        let (progress, receiver) = Progress::new();
        let previous = self
            .tracked
            .insert(operation.operation_id, Arc::clone(&progress));
        assert!(
            previous.is_none(),
            "operation {:?} was already tracked",
            operation.operation_id
        );

        (progress, receiver)
    }

    /// The cluster accepted the operation into the replicated log.
    pub fn track_replication(&self, operation: &DistributedOperation) {
        if operation.global_session != self.session {
            return;
        }
        match self.tracked.get(&operation.operation_id) {
            Some(entry) => entry.set_replicated(),
            None => slog::debug!(
                self.logger,
                "Replication signal for untracked operation {:?}",
                operation.operation_id
            ),
        }
    }

    /// The applying side finished the operation. Removes the entry and
    /// resolves its result exactly once; a redelivered signal is a no-op.
    pub fn track_result(&self, operation: &DistributedOperation, outcome: OperationOutcome) {
        if operation.global_session != self.session {
            return;
        }
        match self.tracked.remove(&operation.operation_id) {
            Some((_, progress)) => progress.complete(outcome),
            None => slog::debug!(
                self.logger,
                "Result signal for untracked operation {:?}",
                operation.operation_id
            ),
        }
    }

    /// Stop tracking without resolving the result. The caller independently
    /// fails its own submission; anyone holding the result future observes
    /// the abort as a closed channel.
    pub fn abort(&self, operation: &DistributedOperation) {
        self.tracked.remove(&operation.operation_id);
    }

    /// Wake every tracked operation's waiter, without marking anything.
    /// Called on leader-switch notifications so blocked submitters re-check
    /// the leader promptly instead of sleeping out their full timeout.
    pub fn trigger_replication_event(&self) {
        for entry in self.tracked.iter() {
            entry.value().trigger_replication_event();
        }
    }

    pub fn in_progress_count(&self) -> usize {
        self.tracked.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MemberId;
    use crate::replication::content::{DummyContent, ReplicatedContent};
    use bytes::Bytes;

    fn test_logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    fn operation(session: GlobalSession, seq: i64) -> DistributedOperation {
        DistributedOperation {
            content: ReplicatedContent::Dummy(DummyContent {
                payload: Bytes::from_static(b"x"),
            }),
            global_session: session,
            operation_id: LocalOperationId {
                local_session_id: 1,
                sequence_number: seq,
            },
        }
    }

    #[tokio::test]
    async fn result_resolves_future_and_removes_entry() {
        let session = GlobalSession::new(MemberId::random());
        let tracker = ProgressTracker::new(test_logger(), session);
        let op = operation(session, 0);

        let (_, receiver) = tracker.start(&op);
        tracker.track_result(&op, OperationOutcome::Applied(Bytes::from_static(b"ok")));

        assert_eq!(0, tracker.in_progress_count());
        assert_eq!(
            OperationOutcome::Applied(Bytes::from_static(b"ok")),
            receiver.await.expect("result should be delivered")
        );
    }

    #[tokio::test]
    async fn track_result_is_idempotent() {
        let session = GlobalSession::new(MemberId::random());
        let tracker = ProgressTracker::new(test_logger(), session);
        let op = operation(session, 0);

        let (_, receiver) = tracker.start(&op);
        tracker.track_result(&op, OperationOutcome::Applied(Bytes::from_static(b"first")));
        tracker.track_result(&op, OperationOutcome::Applied(Bytes::from_static(b"second")));

        assert_eq!(
            OperationOutcome::Applied(Bytes::from_static(b"first")),
            receiver.await.expect("result should be delivered")
        );
    }

    #[tokio::test]
    async fn out_of_order_replication_signals_work_independently() {
        let session = GlobalSession::new(MemberId::random());
        let tracker = ProgressTracker::new(test_logger(), session);
        let first = operation(session, 1);
        let second = operation(session, 2);

        let (first_progress, _first_rx) = tracker.start(&first);
        let (second_progress, _second_rx) = tracker.start(&second);

        // The cluster acknowledges the later operation first.
        tracker.track_replication(&second);
        assert!(second_progress.is_replicated());
        assert!(!first_progress.is_replicated());

        tracker.track_replication(&first);
        assert!(first_progress.is_replicated());
    }

    #[tokio::test]
    async fn foreign_session_signals_are_ignored() {
        let session = GlobalSession::new(MemberId::random());
        let foreign = GlobalSession::new(MemberId::random());
        let tracker = ProgressTracker::new(test_logger(), session);
        let op = operation(session, 0);

        let (progress, _receiver) = tracker.start(&op);

        tracker.track_replication(&operation(foreign, 0));
        tracker.track_result(
            &operation(foreign, 0),
            OperationOutcome::Failed("foreign".into()),
        );

        assert!(!progress.is_replicated());
        assert_eq!(1, tracker.in_progress_count());
    }

    #[tokio::test]
    async fn unknown_operation_signals_are_ignored() {
        let session = GlobalSession::new(MemberId::random());
        let tracker = ProgressTracker::new(test_logger(), session);

        // Neither call should panic or create entries.
        tracker.track_replication(&operation(session, 42));
        tracker.track_result(&operation(session, 42), OperationOutcome::Failed("late".into()));

        assert_eq!(0, tracker.in_progress_count());
    }

    #[tokio::test]
    async fn abort_drops_the_result_channel() {
        let session = GlobalSession::new(MemberId::random());
        let tracker = ProgressTracker::new(test_logger(), session);
        let op = operation(session, 0);

        let (_, receiver) = tracker.start(&op);
        tracker.abort(&op);

        assert_eq!(0, tracker.in_progress_count());
        assert!(receiver.await.is_err());
    }

    #[tokio::test]
    async fn trigger_replication_event_wakes_all_waiters() {
        let session = GlobalSession::new(MemberId::random());
        let tracker = Arc::new(ProgressTracker::new(test_logger(), session));

        let mut waiters = Vec::new();
        for seq in 0..3 {
            let (progress, _receiver) = tracker.start(&operation(session, seq));
            waiters.push(tokio::task::spawn(async move {
                progress
                    .await_replication(tokio::time::Duration::from_secs(30))
                    .await
            }));
        }

        tokio::task::yield_now().await;
        tracker.trigger_replication_event();

        for waiter in waiters {
            assert!(!waiter.await.expect("waiter task panicked"));
        }
    }
}
