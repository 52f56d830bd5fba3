mod cluster;
mod messages;
mod replication;
mod wire;

pub use cluster::AvailabilityFlag;
pub use cluster::AvailabilityGuard;
pub use cluster::ClusterId;
pub use cluster::Directed;
pub use cluster::LeaderLocator;
pub use cluster::MemberId;
pub use cluster::NoLeaderFound;
pub use cluster::Outbound;
pub use cluster::Unavailable;
pub use messages::AppendEntriesRequest;
pub use messages::AppendEntriesResponse;
pub use messages::ClusterIdAwareMessage;
pub use messages::Heartbeat;
pub use messages::HeartbeatResponse;
pub use messages::LogCompactionInfo;
pub use messages::LogEntry;
pub use messages::MessageType;
pub use messages::NewEntryBatchRequest;
pub use messages::NewEntryRequest;
pub use messages::PreVoteRequest;
pub use messages::PreVoteResponse;
pub use messages::RaftMessage;
pub use messages::VoteRequest;
pub use messages::VoteResponse;
pub use replication::BackoffTimeout;
pub use replication::DistributedOperation;
pub use replication::DummyContent;
pub use replication::ExponentialBackoff;
pub use replication::GlobalSession;
pub use replication::LocalOperationId;
pub use replication::LocalSessionPool;
pub use replication::LockTokenRequest;
pub use replication::NoOpMonitor;
pub use replication::OperationContext;
pub use replication::OperationOutcome;
pub use replication::Progress;
pub use replication::ProgressTracker;
pub use replication::RaftReplicator;
pub use replication::RaftReplicatorConfig;
pub use replication::ReplicatedContent;
pub use replication::ReplicatedTransaction;
pub use replication::ReplicationFailure;
pub use replication::ReplicationMonitor;
pub use replication::ReplicatorOptions;
pub use replication::ResultAbandoned;
pub use replication::ResultFuture;
pub use replication::ThrottleGuard;
pub use replication::Throttler;
pub use wire::ChunkAssembler;
pub use wire::ComposedContent;
pub use wire::ContentType;
pub use wire::ContentTypeDispatcher;
pub use wire::MessageComposer;
pub use wire::MessageCreator;
pub use wire::RaftWireDecoder;
pub use wire::RaftWireEncoder;
pub use wire::WireError;

// The root mod only exports; all impl lives in the concern-specific mods.
