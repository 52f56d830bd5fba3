use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use raft_replication::{
    AvailabilityFlag, ClusterId, ClusterIdAwareMessage, Directed, DistributedOperation,
    DummyContent, LeaderLocator, MemberId, NoLeaderFound, OperationOutcome, Outbound,
    RaftMessage, RaftReplicator, RaftReplicatorConfig, RaftWireDecoder, RaftWireEncoder,
    ReplicatedContent, ReplicationFailure, ReplicationMonitor, ReplicatorOptions,
};
use slog::Drain;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_util::codec::{Decoder, Encoder};

struct StubLeaderLocator {
    leader: Mutex<Option<MemberId>>,
}

impl StubLeaderLocator {
    fn new(leader: Option<MemberId>) -> Arc<Self> {
        Arc::new(StubLeaderLocator {
            leader: Mutex::new(leader),
        })
    }

    fn set_leader(&self, leader: Option<MemberId>) {
        *self.leader.lock().unwrap() = leader;
    }
}

impl LeaderLocator for StubLeaderLocator {
    fn leader(&self) -> Result<MemberId, NoLeaderFound> {
        (*self.leader.lock().unwrap()).ok_or(NoLeaderFound)
    }
}

struct RecordingOutbound {
    sends: mpsc::UnboundedSender<Directed>,
}

impl RecordingOutbound {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Directed>) {
        let (sends, receiver) = mpsc::unbounded_channel();
        (Arc::new(RecordingOutbound { sends }), receiver)
    }
}

#[async_trait]
impl Outbound for RecordingOutbound {
    async fn send(&self, to: MemberId, message: RaftMessage, _block_until_sent: bool) {
        let _ = self.sends.send(Directed { to, message });
    }
}

#[derive(Default)]
struct CountingMonitor {
    started: AtomicUsize,
    attempts: AtomicUsize,
    successes: AtomicUsize,
    failures: AtomicUsize,
}

impl ReplicationMonitor for CountingMonitor {
    fn start_replication(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }
    fn replication_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::SeqCst);
    }
    fn successful_replication(&self) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }
    fn failed_replication(&self, _failure: &ReplicationFailure) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }
}

struct Rig {
    replicator: Arc<RaftReplicator>,
    leader_locator: Arc<StubLeaderLocator>,
    availability: Arc<AvailabilityFlag>,
    monitor: Arc<CountingMonitor>,
    sends: mpsc::UnboundedReceiver<Directed>,
}

fn rig_with_options(leader: Option<MemberId>, options: ReplicatorOptions) -> Rig {
    let me = MemberId::random();
    let leader_locator = StubLeaderLocator::new(leader);
    let (outbound, sends) = RecordingOutbound::new();
    let availability = Arc::new(AvailabilityFlag::new(true));
    let monitor = Arc::new(CountingMonitor::default());

    let replicator = RaftReplicator::new(RaftReplicatorConfig {
        logger: create_root_logger(),
        me,
        leader_locator: leader_locator.clone(),
        outbound,
        availability: availability.clone(),
        session_pool: Arc::new(raft_replication::LocalSessionPool::new(me)),
        monitor: monitor.clone(),
        options,
    })
    .expect("valid replicator options");

    Rig {
        replicator: Arc::new(replicator),
        leader_locator,
        availability,
        monitor,
        sends,
    }
}

fn rig(leader: Option<MemberId>) -> Rig {
    rig_with_options(leader, fast_options())
}

fn fast_options() -> ReplicatorOptions {
    ReplicatorOptions {
        progress_retry_initial: Some(Duration::from_millis(20)),
        progress_retry_upper_bound: Some(Duration::from_millis(100)),
        leader_retry_initial: Some(Duration::from_millis(10)),
        leader_retry_upper_bound: Some(Duration::from_millis(50)),
        availability_timeout: Some(Duration::from_millis(100)),
        credit_limit: Some(1024 * 1024),
    }
}

fn dummy_content(payload: &'static [u8]) -> ReplicatedContent {
    ReplicatedContent::Dummy(DummyContent {
        payload: Bytes::from_static(payload),
    })
}

fn operation_of(directed: &Directed) -> DistributedOperation {
    match &directed.message {
        RaftMessage::NewEntryRequest(request) => match &request.content {
            ReplicatedContent::Operation(operation) => (**operation).clone(),
            other => panic!("expected an operation payload, got {:?}", other),
        },
        other => panic!("expected a NewEntryRequest, got {:?}", other),
    }
}

/// Push the message through the real wire codec, as the network would.
fn round_trip_over_the_wire(directed: Directed) -> Directed {
    let cluster_id = ClusterId::random();
    let mut encoder = RaftWireEncoder::new(16); // tiny chunks on purpose
    let mut buf = BytesMut::new();
    encoder
        .encode(
            ClusterIdAwareMessage {
                cluster_id,
                message: directed.message,
            },
            &mut buf,
        )
        .expect("encoding is infallible");

    let mut decoder = RaftWireDecoder::new(create_root_logger());
    let received = decoder
        .decode(&mut buf)
        .expect("well-formed stream")
        .expect("one full message was encoded");
    assert!(buf.is_empty());
    assert_eq!(cluster_id, received.cluster_id);

    Directed {
        to: directed.to,
        message: received.message,
    }
}

#[tokio::test]
async fn replicate_resolves_once_result_is_delivered() {
    let leader = MemberId::random();
    let mut rig = rig(Some(leader));

    let submission = {
        let replicator = rig.replicator.clone();
        tokio::task::spawn(async move { replicator.replicate(dummy_content(b"op"), true).await })
    };

    // The leader receives the operation; run it through the codec like a
    // real connection would before acknowledging.
    let sent = rig.sends.recv().await.expect("a send should happen");
    assert_eq!(leader, sent.to);
    let delivered = round_trip_over_the_wire(sent);
    let operation = operation_of(&delivered);

    let tracker = rig.replicator.progress_tracker();
    tracker.track_replication(&operation);

    let result_future = submission
        .await
        .expect("submission task panicked")
        .expect("replication should succeed");

    // Still tracked: the applying side has not reported the outcome yet.
    assert_eq!(1, tracker.in_progress_count());
    tracker.track_result(&operation, OperationOutcome::Applied(Bytes::from_static(b"done")));
    assert_eq!(0, tracker.in_progress_count());

    assert_eq!(
        OperationOutcome::Applied(Bytes::from_static(b"done")),
        result_future.outcome().await.expect("result was delivered")
    );

    assert_eq!(1, rig.monitor.started.load(Ordering::SeqCst));
    assert_eq!(1, rig.monitor.successes.load(Ordering::SeqCst));
    assert!(rig.monitor.attempts.load(Ordering::SeqCst) >= 1);
    assert_eq!(0, rig.monitor.failures.load(Ordering::SeqCst));
}

#[tokio::test]
async fn no_leader_fails_fast_without_sending() {
    let mut rig = rig(None);

    let result = rig.replicator.replicate(dummy_content(b"op"), true).await;

    assert!(matches!(result, Err(ReplicationFailure::NoLeader(_))));
    assert!(rig.sends.try_recv().is_err(), "nothing should be sent");
    assert_eq!(0, rig.replicator.progress_tracker().in_progress_count());
    assert_eq!(1, rig.monitor.failures.load(Ordering::SeqCst));
    assert_eq!(0, rig.monitor.attempts.load(Ordering::SeqCst));
}

#[tokio::test]
async fn leader_switch_mid_retry_aborts_the_operation() {
    let original_leader = MemberId::random();
    let new_leader = MemberId::random();
    let mut rig = rig(Some(original_leader));

    let submission = {
        let replicator = rig.replicator.clone();
        tokio::task::spawn(async move { replicator.replicate(dummy_content(b"op"), true).await })
    };

    // First attempt goes to the original leader and is never acknowledged.
    let sent = rig.sends.recv().await.expect("a send should happen");
    assert_eq!(original_leader, sent.to);

    // The cluster elects someone else; wake the blocked submitter.
    rig.leader_locator.set_leader(Some(new_leader));
    rig.replicator.on_leader_switch();

    let result = submission.await.expect("submission task panicked");
    match result {
        Err(ReplicationFailure::LeaderSwitch { expected, observed }) => {
            assert_eq!(original_leader, expected);
            assert_eq!(new_leader, observed);
        }
        other => panic!("expected a leader switch failure, got {:?}", other),
    }

    assert_eq!(0, rig.replicator.progress_tracker().in_progress_count());

    // No further sends once the switch was observed.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let mut extra_sends = 0;
    while rig.sends.try_recv().is_ok() {
        extra_sends += 1;
    }
    assert_eq!(0, extra_sends);
    assert_eq!(1, rig.monitor.failures.load(Ordering::SeqCst));
}

#[tokio::test]
async fn unavailable_database_fails_the_call() {
    let leader = MemberId::random();
    let mut rig = rig(Some(leader));
    rig.availability.set_available(false);

    let result = rig.replicator.replicate(dummy_content(b"op"), true).await;

    assert!(matches!(result, Err(ReplicationFailure::Unavailable(_))));
    assert!(rig.sends.try_recv().is_err(), "nothing should be sent");
    assert_eq!(0, rig.replicator.progress_tracker().in_progress_count());
}

#[tokio::test]
async fn unacknowledged_send_is_retried_until_replicated() {
    let leader = MemberId::random();
    let mut rig = rig(Some(leader));

    let submission = {
        let replicator = rig.replicator.clone();
        tokio::task::spawn(async move { replicator.replicate(dummy_content(b"op"), false).await })
    };

    // Let the progress timeout lapse at least once before acknowledging.
    let first = rig.sends.recv().await.expect("first send");
    let second = rig.sends.recv().await.expect("resend after timeout");
    assert_eq!(operation_of(&first), operation_of(&second));

    let operation = operation_of(&second);
    rig.replicator.progress_tracker().track_replication(&operation);

    let result_future = submission
        .await
        .expect("submission task panicked")
        .expect("replication should succeed");

    // Untracked submissions still get their result future (step 7); only
    // the cleanup timing differs.
    rig.replicator
        .progress_tracker()
        .track_result(&operation, OperationOutcome::Applied(Bytes::new()));
    assert_eq!(
        OperationOutcome::Applied(Bytes::new()),
        result_future.outcome().await.expect("result was delivered")
    );
    assert!(rig.monitor.attempts.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn transient_leader_lookup_failure_is_retried_not_fatal() {
    // Losing the leader mid-loop (an election in progress) is transient:
    // the submitter backs off and retries the lookup. Only a *different*
    // leader aborts the attempt.
    let leader = MemberId::random();
    let mut rig = rig(Some(leader));

    let submission = {
        let replicator = rig.replicator.clone();
        tokio::task::spawn(async move { replicator.replicate(dummy_content(b"op"), false).await })
    };

    let first = rig.sends.recv().await.expect("first send");

    // Election in progress; lookups fail for a while, then the same member
    // wins again.
    rig.leader_locator.set_leader(None);
    tokio::time::sleep(Duration::from_millis(50)).await;
    rig.leader_locator.set_leader(Some(leader));

    // The submitter resumes sending to the same leader.
    let resumed = rig.sends.recv().await.expect("send after leader returned");
    assert_eq!(leader, resumed.to);
    assert_eq!(operation_of(&first), operation_of(&resumed));

    let operation = operation_of(&resumed);
    rig.replicator.progress_tracker().track_replication(&operation);
    submission
        .await
        .expect("submission task panicked")
        .expect("replication should succeed");
}

fn create_root_logger() -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    slog::Logger::root(drain, slog::o!())
}
