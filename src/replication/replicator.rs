use crate::cluster::{
    AvailabilityGuard, LeaderLocator, MemberId, NoLeaderFound, Outbound, Unavailable,
};
use crate::messages::{NewEntryRequest, RaftMessage};
use crate::replication::content::ReplicatedContent;
use crate::replication::monitor::ReplicationMonitor;
use crate::replication::operation::DistributedOperation;
use crate::replication::options::{ReplicatorOptions, ReplicatorOptionsValidated};
use crate::replication::progress::OperationOutcome;
use crate::replication::session::{LocalSessionPool, OperationContext};
use crate::replication::throttler::{ThrottleGuard, Throttler};
use crate::replication::tracker::ProgressTracker;
use std::convert::TryFrom;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::Duration;

/// Why a replicate() call failed. When any of these is returned the
/// operation is no longer tracked; resubmitting is the caller's decision.
#[derive(Debug, thiserror::Error)]
pub enum ReplicationFailure {
    #[error("Cannot replicate operation. No leader is currently available.")]
    NoLeader(#[source] NoLeaderFound),

    // A leader switch invalidates the attempt: the old leader may or may not
    // have accepted the operation, and blindly resending to the new leader
    // could duplicate it. The caller resubmits under a fresh operation id.
    #[error("Leader switched from {expected:?} to {observed:?} during replication.")]
    LeaderSwitch {
        expected: MemberId,
        observed: MemberId,
    },

    #[error("Database is not available for replication.")]
    Unavailable(#[source] Unavailable),
}

pub struct RaftReplicatorConfig {
    pub logger: slog::Logger,
    pub me: MemberId,
    pub leader_locator: Arc<dyn LeaderLocator>,
    pub outbound: Arc<dyn Outbound>,
    pub availability: Arc<dyn AvailabilityGuard>,
    pub session_pool: Arc<LocalSessionPool>,
    pub monitor: Arc<dyn ReplicationMonitor>,
    pub options: ReplicatorOptions,
}

/// RaftReplicator forwards client operations to the cluster leader and sees
/// each one through to a replication acknowledgment, resending on timeout
/// and backing off while elections are in progress.
pub struct RaftReplicator {
    logger: slog::Logger,
    me: MemberId,
    leader_locator: Arc<dyn LeaderLocator>,
    outbound: Arc<dyn Outbound>,
    availability: Arc<dyn AvailabilityGuard>,
    session_pool: Arc<LocalSessionPool>,
    progress_tracker: Arc<ProgressTracker>,
    throttler: Throttler,
    monitor: Arc<dyn ReplicationMonitor>,
    options: ReplicatorOptionsValidated,
}

impl RaftReplicator {
    pub fn new(config: RaftReplicatorConfig) -> Result<Self, &'static str> {
        let options = ReplicatorOptionsValidated::try_from(config.options)?;
        let progress_tracker = Arc::new(ProgressTracker::new(
            config.logger.clone(),
            config.session_pool.global_session(),
        ));
        let throttler = Throttler::new(options.credit_limit);

        Ok(RaftReplicator {
            logger: config.logger,
            me: config.me,
            leader_locator: config.leader_locator,
            outbound: config.outbound,
            availability: config.availability,
            session_pool: config.session_pool,
            progress_tracker,
            throttler,
            monitor: config.monitor,
            options,
        })
    }

    /// The applying side delivers replication/result signals through this.
    pub fn progress_tracker(&self) -> &Arc<ProgressTracker> {
        &self.progress_tracker
    }

    /// Leader-switch notification hook. Wakes every blocked submitter so it
    /// re-checks the leader now instead of sleeping out its full timeout.
    pub fn on_leader_switch(&self) {
        self.progress_tracker.trigger_replication_event();
    }

    /// Submit `content` for replication. Resolves to a future of the applied
    /// result once the cluster has accepted the operation.
    ///
    /// With `track_result` the operation's session and throttle credit are
    /// held until the returned future completes (or is dropped); without it
    /// both are released as soon as replication is acknowledged.
    pub async fn replicate(
        &self,
        content: ReplicatedContent,
        track_result: bool,
    ) -> Result<ResultFuture, ReplicationFailure> {
        self.monitor.start_replication();
        match self.replicate0(content, track_result).await {
            Ok(future) => {
                self.monitor.successful_replication();
                Ok(future)
            }
            Err(failure) => {
                self.monitor.failed_replication(&failure);
                Err(failure)
            }
        }
    }

    async fn replicate0(
        &self,
        content: ReplicatedContent,
        track_result: bool,
    ) -> Result<ResultFuture, ReplicationFailure> {
        // Leader at submission time. Failing here is cheap: nothing has been
        // sent and nothing is tracked yet.
        let expected_leader = self
            .leader_locator
            .leader()
            .map_err(ReplicationFailure::NoLeader)?;

        // Credit proportional to content size; sizeless content is unthrottled.
        let credit = match content.size() {
            Some(size) => Some(self.throttler.acquire(size as i64).await),
            None => None,
        };

        let context = self.session_pool.acquire_session();
        let operation = DistributedOperation {
            content,
            global_session: context.global_session,
            operation_id: context.operation_id,
        };
        let (progress, receiver) = self.progress_tracker.start(&operation);

        // If this future is dropped, or we bail out below, the operation
        // must not linger in the tracker.
        let mut track_guard = TrackGuard {
            tracker: &self.progress_tracker,
            operation: &operation,
            session_pool: &self.session_pool,
            context: Some(context),
            armed: true,
        };

        let logger = self
            .logger
            .new(slog::o!("Operation" => format!("{:?}", operation.operation_id)));

        let mut progress_timeout = self.options.progress_backoff.new_timeout();
        let mut leader_timeout = self.options.leader_backoff.new_timeout();

        while !progress.is_replicated() {
            if let Err(unavailable) = self
                .availability
                .await_available(self.options.availability_timeout)
                .await
            {
                slog::warn!(logger, "Database unavailable. Aborting replication.");
                return Err(ReplicationFailure::Unavailable(unavailable));
            }

            match self.leader_locator.leader() {
                Ok(observed) if observed != expected_leader => {
                    slog::info!(
                        logger,
                        "Leader switched from {:?} to {:?}. Aborting replication.",
                        expected_leader,
                        observed,
                    );
                    return Err(ReplicationFailure::LeaderSwitch {
                        expected: expected_leader,
                        observed,
                    });
                }
                Ok(leader) => {
                    self.monitor.replication_attempt();
                    let request = RaftMessage::NewEntryRequest(NewEntryRequest {
                        from: self.me,
                        content: ReplicatedContent::Operation(Box::new(operation.clone())),
                    });
                    self.outbound.send(leader, request, true).await;

                    if !progress.await_replication(progress_timeout.duration()).await {
                        progress_timeout.increment();
                    }
                }
                Err(NoLeaderFound) => {
                    // An election is likely in progress. Give it room.
                    slog::debug!(
                        logger,
                        "No leader found. Retrying lookup in {:?}.",
                        leader_timeout.base(),
                    );
                    tokio::time::sleep(leader_timeout.duration()).await;
                    leader_timeout.increment();
                }
            }
        }

        // Replicated. The tracker entry stays until the applying side
        // delivers the result; only the failure cleanup is disarmed.
        let context = track_guard.disarm();

        let cleanup = Cleanup {
            _credit: credit,
            session: Some((Arc::clone(&self.session_pool), context)),
        };

        if track_result {
            Ok(ResultFuture {
                receiver,
                _cleanup: Some(cleanup),
            })
        } else {
            // Nobody waits for the result; release the session and credit now.
            drop(cleanup);
            Ok(ResultFuture {
                receiver,
                _cleanup: None,
            })
        }
    }
}

/// Aborts the tracked operation and returns its session unless disarmed.
/// Covers both early error returns and cancellation of the whole call.
struct TrackGuard<'a> {
    tracker: &'a ProgressTracker,
    operation: &'a DistributedOperation,
    session_pool: &'a Arc<LocalSessionPool>,
    context: Option<OperationContext>,
    armed: bool,
}

impl TrackGuard<'_> {
    fn disarm(&mut self) -> OperationContext {
        self.armed = false;
        self.context
            .take()
            .expect("TrackGuard disarmed more than once")
    }
}

impl Drop for TrackGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.tracker.abort(self.operation);
            if let Some(context) = self.context.take() {
                self.session_pool.release_session(context);
            }
        }
    }
}

/// ResultFuture resolves once the applying side reports the operation's
/// outcome. Dropping it without awaiting releases the operation's session
/// and throttle credit.
pub struct ResultFuture {
    receiver: oneshot::Receiver<OperationOutcome>,
    _cleanup: Option<Cleanup>,
}

impl std::fmt::Debug for ResultFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ResultFuture")
    }
}

impl ResultFuture {
    /// Wait for the applied outcome. Err means the operation was aborted
    /// (e.g. session teardown) before any result was delivered.
    pub async fn outcome(self) -> Result<OperationOutcome, ResultAbandoned> {
        let ResultFuture { receiver, _cleanup } = self;
        receiver.await.map_err(|_| ResultAbandoned)
    }

    /// Wait for the applied outcome, up to `timeout`.
    pub async fn outcome_within(
        self,
        timeout: Duration,
    ) -> Result<OperationOutcome, ResultAbandoned> {
        match tokio::time::timeout(timeout, self.outcome()).await {
            Ok(result) => result,
            Err(_) => Err(ResultAbandoned),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Operation was abandoned before a result was delivered.")]
pub struct ResultAbandoned;

struct Cleanup {
    _credit: Option<ThrottleGuard>,
    session: Option<(Arc<LocalSessionPool>, OperationContext)>,
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        if let Some((pool, context)) = self.session.take() {
            pool.release_session(context);
        }
        // The credit guard releases itself.
    }
}
