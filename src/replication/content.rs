use crate::cluster::MemberId;
use crate::replication::operation::DistributedOperation;
use bytes::Bytes;

/// ReplicatedContent is the application payload carried through consensus.
/// The consensus core treats it as opaque; only the state machines on the
/// applying side look inside.
#[derive(Clone, Debug, PartialEq)]
pub enum ReplicatedContent {
    /// A session-tracked client operation. This is what the replicator
    /// actually ships: the caller's content wrapped with its identity.
    Operation(Box<DistributedOperation>),
    /// Request to acquire the cluster-wide lock token.
    LockTokenRequest(LockTokenRequest),
    /// An already-serialized transaction.
    Transaction(ReplicatedTransaction),
    /// Benchmark payload with no semantic meaning.
    Dummy(DummyContent),
}

impl ReplicatedContent {
    /// Byte size for throttling purposes. Content without a meaningful size
    /// (lock token requests) is admitted unthrottled.
    pub fn size(&self) -> Option<usize> {
        match self {
            ReplicatedContent::Operation(operation) => operation.content.size(),
            ReplicatedContent::LockTokenRequest(_) => None,
            ReplicatedContent::Transaction(tx) => Some(tx.tx_bytes.len()),
            ReplicatedContent::Dummy(dummy) => Some(dummy.payload.len()),
        }
    }

    pub fn has_size(&self) -> bool {
        self.size().is_some()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LockTokenRequest {
    pub owner: MemberId,
    pub candidate_id: u32,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReplicatedTransaction {
    pub tx_bytes: Bytes,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DummyContent {
    pub payload: Bytes,
}
