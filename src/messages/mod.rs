mod message;

pub use message::AppendEntriesRequest;
pub use message::AppendEntriesResponse;
pub use message::ClusterIdAwareMessage;
pub use message::Heartbeat;
pub use message::HeartbeatResponse;
pub use message::LogCompactionInfo;
pub use message::LogEntry;
pub use message::MessageType;
pub use message::NewEntryBatchRequest;
pub use message::NewEntryRequest;
pub use message::PreVoteRequest;
pub use message::PreVoteResponse;
pub use message::RaftMessage;
pub use message::VoteRequest;
pub use message::VoteResponse;
