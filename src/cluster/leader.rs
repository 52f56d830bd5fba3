use crate::cluster::ids::MemberId;

/// LeaderLocator resolves the cluster member currently authorized to order
/// and replicate operations. Backed by the consensus core's election state;
/// this layer only consumes the answer.
pub trait LeaderLocator: Send + Sync {
    fn leader(&self) -> Result<MemberId, NoLeaderFound>;
}

// Transient by nature. An election may be in progress; callers back off and
// retry rather than treating this as fatal.
#[derive(Clone, Copy, Debug, thiserror::Error)]
#[error("No leader is currently known to this member")]
pub struct NoLeaderFound;
