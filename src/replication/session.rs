use crate::cluster::MemberId;
use crate::replication::operation::{GlobalSession, LocalOperationId};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// One local session: a lane of strictly increasing sequence numbers. A lane
/// is only ever used by one in-flight operation at a time.
#[derive(Debug)]
struct LocalSession {
    local_session_id: i64,
    next_sequence_number: i64,
}

impl LocalSession {
    fn new(local_session_id: i64) -> Self {
        LocalSession {
            local_session_id,
            next_sequence_number: 0,
        }
    }

    fn next_operation_id(&mut self) -> LocalOperationId {
        let sequence_number = self.next_sequence_number;
        self.next_sequence_number += 1;
        LocalOperationId {
            local_session_id: self.local_session_id,
            sequence_number,
        }
    }
}

/// OperationContext is one acquired submission slot: the shared global
/// session plus the operation id minted for this submission. Hand it back
/// with `release_session` once the operation's lifecycle is over so the
/// lane can be reused.
#[derive(Debug)]
pub struct OperationContext {
    pub global_session: GlobalSession,
    pub operation_id: LocalOperationId,
    session: LocalSession,
}

/// LocalSessionPool hands out (GlobalSession, LocalOperationId) pairs. Idle
/// lanes are reused; a new lane is minted when all are busy.
pub struct LocalSessionPool {
    global_session: GlobalSession,
    next_local_session_id: AtomicI64,
    idle_sessions: Mutex<VecDeque<LocalSession>>,
}

impl LocalSessionPool {
    pub fn new(owner: MemberId) -> Self {
        LocalSessionPool {
            global_session: GlobalSession::new(owner),
            next_local_session_id: AtomicI64::new(1),
            idle_sessions: Mutex::new(VecDeque::new()),
        }
    }

    pub fn global_session(&self) -> GlobalSession {
        self.global_session
    }

    pub fn acquire_session(&self) -> OperationContext {
        let mut session = self
            .idle_sessions
            .lock()
            .expect("LocalSessionPool.acquire_session() mutex guard poison")
            .pop_front()
            .unwrap_or_else(|| {
                LocalSession::new(self.next_local_session_id.fetch_add(1, Ordering::Relaxed))
            });

        let operation_id = session.next_operation_id();

        OperationContext {
            global_session: self.global_session,
            operation_id,
            session,
        }
    }

    pub fn release_session(&self, context: OperationContext) {
        self.idle_sessions
            .lock()
            .expect("LocalSessionPool.release_session() mutex guard poison")
            .push_back(context.session);
    }
}
