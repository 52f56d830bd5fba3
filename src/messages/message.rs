use crate::cluster::{ClusterId, MemberId};
use crate::replication::ReplicatedContent;

/// Wire ordinal of every message shape. Positions identify messages on the
/// wire; changing them breaks rolling upgrades. The gaps (7, 8, 11) belong
/// to the consensus core's local timeout and prune events, which never cross
/// the network.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MessageType {
    VoteRequest = 0,
    VoteResponse = 1,
    AppendEntriesRequest = 2,
    AppendEntriesResponse = 3,
    Heartbeat = 4,
    HeartbeatResponse = 5,
    LogCompactionInfo = 6,
    NewEntryRequest = 9,
    NewEntryBatchRequest = 10,
    PreVoteRequest = 12,
    PreVoteResponse = 13,
}

impl MessageType {
    pub fn ordinal(self) -> i32 {
        self as i32
    }

    pub fn from_ordinal(ordinal: i32) -> Option<MessageType> {
        match ordinal {
            0 => Some(MessageType::VoteRequest),
            1 => Some(MessageType::VoteResponse),
            2 => Some(MessageType::AppendEntriesRequest),
            3 => Some(MessageType::AppendEntriesResponse),
            4 => Some(MessageType::Heartbeat),
            5 => Some(MessageType::HeartbeatResponse),
            6 => Some(MessageType::LogCompactionInfo),
            9 => Some(MessageType::NewEntryRequest),
            10 => Some(MessageType::NewEntryBatchRequest),
            12 => Some(MessageType::PreVoteRequest),
            13 => Some(MessageType::PreVoteResponse),
            _ => None,
        }
    }
}

/// RaftMessage is every message shape this layer can put on or take off the
/// wire. Consumers dispatch with a plain `match`.
#[derive(Clone, Debug, PartialEq)]
pub enum RaftMessage {
    VoteRequest(VoteRequest),
    VoteResponse(VoteResponse),
    PreVoteRequest(PreVoteRequest),
    PreVoteResponse(PreVoteResponse),
    AppendEntriesRequest(AppendEntriesRequest),
    AppendEntriesResponse(AppendEntriesResponse),
    Heartbeat(Heartbeat),
    HeartbeatResponse(HeartbeatResponse),
    LogCompactionInfo(LogCompactionInfo),
    NewEntryRequest(NewEntryRequest),
    NewEntryBatchRequest(NewEntryBatchRequest),
}

impl RaftMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            RaftMessage::VoteRequest(_) => MessageType::VoteRequest,
            RaftMessage::VoteResponse(_) => MessageType::VoteResponse,
            RaftMessage::PreVoteRequest(_) => MessageType::PreVoteRequest,
            RaftMessage::PreVoteResponse(_) => MessageType::PreVoteResponse,
            RaftMessage::AppendEntriesRequest(_) => MessageType::AppendEntriesRequest,
            RaftMessage::AppendEntriesResponse(_) => MessageType::AppendEntriesResponse,
            RaftMessage::Heartbeat(_) => MessageType::Heartbeat,
            RaftMessage::HeartbeatResponse(_) => MessageType::HeartbeatResponse,
            RaftMessage::LogCompactionInfo(_) => MessageType::LogCompactionInfo,
            RaftMessage::NewEntryRequest(_) => MessageType::NewEntryRequest,
            RaftMessage::NewEntryBatchRequest(_) => MessageType::NewEntryBatchRequest,
        }
    }

    pub fn sender(&self) -> MemberId {
        match self {
            RaftMessage::VoteRequest(m) => m.from,
            RaftMessage::VoteResponse(m) => m.from,
            RaftMessage::PreVoteRequest(m) => m.from,
            RaftMessage::PreVoteResponse(m) => m.from,
            RaftMessage::AppendEntriesRequest(m) => m.from,
            RaftMessage::AppendEntriesResponse(m) => m.from,
            RaftMessage::Heartbeat(m) => m.from,
            RaftMessage::HeartbeatResponse(m) => m.from,
            RaftMessage::LogCompactionInfo(m) => m.from,
            RaftMessage::NewEntryRequest(m) => m.from,
            RaftMessage::NewEntryBatchRequest(m) => m.from,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VoteRequest {
    pub from: MemberId,
    pub term: i64,
    pub candidate: MemberId,
    pub last_log_index: i64,
    pub last_log_term: i64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VoteResponse {
    pub from: MemberId,
    pub term: i64,
    pub vote_granted: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PreVoteRequest {
    pub from: MemberId,
    pub term: i64,
    pub candidate: MemberId,
    pub last_log_index: i64,
    pub last_log_term: i64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PreVoteResponse {
    pub from: MemberId,
    pub term: i64,
    pub vote_granted: bool,
}

/// One log entry as carried by AppendEntriesRequest. Entries appended by a
/// fresh leader to assert its term carry no content.
#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub term: i64,
    pub content: Option<ReplicatedContent>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppendEntriesRequest {
    pub from: MemberId,
    pub leader_term: i64,
    pub prev_log_index: i64,
    pub prev_log_term: i64,
    pub leader_commit: i64,
    pub entries: Vec<LogEntry>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AppendEntriesResponse {
    pub from: MemberId,
    pub term: i64,
    pub success: bool,
    pub match_index: i64,
    pub append_index: i64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Heartbeat {
    pub from: MemberId,
    pub leader_term: i64,
    pub commit_index: i64,
    pub commit_index_term: i64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HeartbeatResponse {
    pub from: MemberId,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogCompactionInfo {
    pub from: MemberId,
    pub leader_term: i64,
    pub prev_index: i64,
}

/// A client operation submitted to the leader for ordering.
#[derive(Clone, Debug, PartialEq)]
pub struct NewEntryRequest {
    pub from: MemberId,
    pub content: ReplicatedContent,
}

/// Several client operations submitted to the leader in one message.
#[derive(Clone, Debug, PartialEq)]
pub struct NewEntryBatchRequest {
    pub from: MemberId,
    pub contents: Vec<ReplicatedContent>,
}

/// A decoded message bound to the cluster it was addressed to.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterIdAwareMessage {
    pub cluster_id: ClusterId,
    pub message: RaftMessage,
}
