mod backoff;
mod content;
mod monitor;
mod operation;
mod options;
mod progress;
mod replicator;
mod session;
mod throttler;
mod tracker;

pub use backoff::BackoffTimeout;
pub use backoff::ExponentialBackoff;
pub use content::DummyContent;
pub use content::LockTokenRequest;
pub use content::ReplicatedContent;
pub use content::ReplicatedTransaction;
pub use monitor::NoOpMonitor;
pub use monitor::ReplicationMonitor;
pub use operation::DistributedOperation;
pub use operation::GlobalSession;
pub use operation::LocalOperationId;
pub use options::ReplicatorOptions;
pub use progress::OperationOutcome;
pub use progress::Progress;
pub use replicator::RaftReplicator;
pub use replicator::RaftReplicatorConfig;
pub use replicator::ReplicationFailure;
pub use replicator::ResultAbandoned;
pub use replicator::ResultFuture;
pub use session::LocalSessionPool;
pub use session::OperationContext;
pub use throttler::ThrottleGuard;
pub use throttler::Throttler;
pub use tracker::ProgressTracker;
