use crate::cluster::ids::MemberId;
use crate::messages::RaftMessage;
use async_trait::async_trait;

/// Directed pairs a message with the member it should be delivered to.
#[derive(Clone, Debug, PartialEq)]
pub struct Directed {
    pub to: MemberId,
    pub message: RaftMessage,
}

/// Outbound is the network send seam. Delivery is best-effort: a message
/// that never arrives shows up as a missing replication acknowledgment, not
/// as an error here. `block_until_sent` asks the transport to flush before
/// returning, for callers about to wait on a reply.
#[async_trait]
pub trait Outbound: Send + Sync {
    async fn send(&self, to: MemberId, message: RaftMessage, block_until_sent: bool);
}
