use crate::replication::replicator::ReplicationFailure;

/// Monitor sink for replication activity. Callbacks fire on the submission
/// path, so implementations must be cheap.
pub trait ReplicationMonitor: Send + Sync {
    /// A replicate() call was made.
    fn start_replication(&self) {}
    /// One send attempt to the leader.
    fn replication_attempt(&self) {}
    /// The operation was accepted into the replicated log.
    fn successful_replication(&self) {}
    /// The call failed; the operation is no longer tracked.
    fn failed_replication(&self, _failure: &ReplicationFailure) {}
}

/// For wiring that doesn't observe replication.
pub struct NoOpMonitor;

impl ReplicationMonitor for NoOpMonitor {}
