use crate::cluster::MemberId;
use crate::replication::content::ReplicatedContent;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// GlobalSession identifies one client's logical connection to the cluster,
/// for de-duplicating operations that get resubmitted or redelivered.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct GlobalSession {
    pub session_id: Uuid,
    pub owner: MemberId,
}

impl GlobalSession {
    pub fn new(owner: MemberId) -> Self {
        GlobalSession {
            session_id: Uuid::new_v4(),
            owner,
        }
    }
}

/// LocalOperationId identifies one operation within a session. Sequence
/// numbers are strictly increasing per local session, giving each client a
/// total order over its own operations.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct LocalOperationId {
    pub local_session_id: i64,
    pub sequence_number: i64,
}

/// DistributedOperation is the unit submitted to the leader.
///
/// Identity is the (session, operation id) pair; content does not
/// participate in equality, so a redelivered operation matches the original
/// it duplicates.
#[derive(Clone, Debug)]
pub struct DistributedOperation {
    pub content: ReplicatedContent,
    pub global_session: GlobalSession,
    pub operation_id: LocalOperationId,
}

impl DistributedOperation {
    pub fn size(&self) -> Option<usize> {
        self.content.size()
    }
}

impl PartialEq for DistributedOperation {
    fn eq(&self, other: &Self) -> bool {
        self.global_session == other.global_session && self.operation_id == other.operation_id
    }
}

impl Eq for DistributedOperation {}

impl Hash for DistributedOperation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.global_session.hash(state);
        self.operation_id.hash(state);
    }
}
