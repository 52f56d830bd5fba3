use crate::cluster::{ClusterId, MemberId};
use crate::replication::{
    DistributedOperation, DummyContent, GlobalSession, LocalOperationId, LockTokenRequest,
    ReplicatedContent, ReplicatedTransaction,
};
use crate::wire::error::WireError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use uuid::Uuid;

// Kind bytes inside a ReplicatedContent unit. Wire protocol; do not renumber.
const KIND_OPERATION: u8 = 0;
const KIND_LOCK_TOKEN_REQUEST: u8 = 1;
const KIND_TRANSACTION: u8 = 2;
const KIND_DUMMY: u8 = 3;

/// Operations wrap other content; bounded so a corrupt stream cannot recurse
/// the decoder into the ground.
const MAX_CONTENT_DEPTH: usize = 4;

fn require(src: &Bytes, needed: usize, field: &'static str) -> Result<(), WireError> {
    if src.remaining() < needed {
        return Err(WireError::Truncated {
            field,
            needed: needed - src.remaining(),
        });
    }
    Ok(())
}

pub(crate) fn get_u8(src: &mut Bytes, field: &'static str) -> Result<u8, WireError> {
    require(src, 1, field)?;
    Ok(src.get_u8())
}

pub(crate) fn get_u32(src: &mut Bytes, field: &'static str) -> Result<u32, WireError> {
    require(src, 4, field)?;
    Ok(src.get_u32())
}

pub(crate) fn get_i32(src: &mut Bytes, field: &'static str) -> Result<i32, WireError> {
    require(src, 4, field)?;
    Ok(src.get_i32())
}

pub(crate) fn get_i64(src: &mut Bytes, field: &'static str) -> Result<i64, WireError> {
    require(src, 8, field)?;
    Ok(src.get_i64())
}

pub(crate) fn get_bool(src: &mut Bytes, field: &'static str) -> Result<bool, WireError> {
    Ok(get_u8(src, field)? != 0)
}

pub(crate) fn put_uuid(dst: &mut BytesMut, id: &Uuid) {
    dst.put_slice(id.as_bytes());
}

pub(crate) fn get_uuid(src: &mut Bytes, field: &'static str) -> Result<Uuid, WireError> {
    require(src, 16, field)?;
    let mut raw = [0u8; 16];
    src.copy_to_slice(&mut raw);
    Ok(Uuid::from_bytes(raw))
}

pub(crate) fn put_member_id(dst: &mut BytesMut, member: &MemberId) {
    put_uuid(dst, member.as_uuid());
}

pub(crate) fn get_member_id(src: &mut Bytes, field: &'static str) -> Result<MemberId, WireError> {
    Ok(MemberId::new(get_uuid(src, field)?))
}

pub(crate) fn put_cluster_id(dst: &mut BytesMut, cluster: &ClusterId) {
    put_uuid(dst, cluster.as_uuid());
}

pub(crate) fn get_cluster_id(src: &mut Bytes, field: &'static str) -> Result<ClusterId, WireError> {
    Ok(ClusterId::new(get_uuid(src, field)?))
}

pub(crate) fn put_content(dst: &mut BytesMut, content: &ReplicatedContent) {
    match content {
        ReplicatedContent::Operation(operation) => {
            dst.put_u8(KIND_OPERATION);
            put_uuid(dst, &operation.global_session.session_id);
            put_member_id(dst, &operation.global_session.owner);
            dst.put_i64(operation.operation_id.local_session_id);
            dst.put_i64(operation.operation_id.sequence_number);
            put_content(dst, &operation.content);
        }
        ReplicatedContent::LockTokenRequest(request) => {
            dst.put_u8(KIND_LOCK_TOKEN_REQUEST);
            put_member_id(dst, &request.owner);
            dst.put_u32(request.candidate_id);
        }
        ReplicatedContent::Transaction(tx) => {
            dst.put_u8(KIND_TRANSACTION);
            dst.put_i32(tx.tx_bytes.len() as i32);
            dst.put_slice(&tx.tx_bytes);
        }
        ReplicatedContent::Dummy(dummy) => {
            dst.put_u8(KIND_DUMMY);
            dst.put_i32(dummy.payload.len() as i32);
            dst.put_slice(&dummy.payload);
        }
    }
}

pub(crate) fn get_content(src: &mut Bytes) -> Result<ReplicatedContent, WireError> {
    get_content_at_depth(src, 0)
}

fn get_content_at_depth(src: &mut Bytes, depth: usize) -> Result<ReplicatedContent, WireError> {
    if depth >= MAX_CONTENT_DEPTH {
        return Err(WireError::NestingTooDeep {
            limit: MAX_CONTENT_DEPTH,
        });
    }

    match get_u8(src, "content kind")? {
        KIND_OPERATION => {
            let session_id = get_uuid(src, "session id")?;
            let owner = get_member_id(src, "session owner")?;
            let local_session_id = get_i64(src, "local session id")?;
            let sequence_number = get_i64(src, "sequence number")?;
            let content = get_content_at_depth(src, depth + 1)?;
            Ok(ReplicatedContent::Operation(Box::new(
                DistributedOperation {
                    content,
                    global_session: GlobalSession { session_id, owner },
                    operation_id: LocalOperationId {
                        local_session_id,
                        sequence_number,
                    },
                },
            )))
        }
        KIND_LOCK_TOKEN_REQUEST => {
            let owner = get_member_id(src, "lock token owner")?;
            let candidate_id = get_u32(src, "lock token candidate id")?;
            Ok(ReplicatedContent::LockTokenRequest(LockTokenRequest {
                owner,
                candidate_id,
            }))
        }
        KIND_TRANSACTION => Ok(ReplicatedContent::Transaction(ReplicatedTransaction {
            tx_bytes: get_sized_bytes(src, "transaction bytes")?,
        })),
        KIND_DUMMY => Ok(ReplicatedContent::Dummy(DummyContent {
            payload: get_sized_bytes(src, "dummy payload")?,
        })),
        other => Err(WireError::UnknownContentKind(other)),
    }
}

fn get_sized_bytes(src: &mut Bytes, field: &'static str) -> Result<Bytes, WireError> {
    let length = get_i32(src, field)?;
    if length < 0 {
        return Err(WireError::NegativeLength(length));
    }
    require(src, length as usize, field)?;
    Ok(src.split_to(length as usize))
}

pub(crate) fn put_terms(dst: &mut BytesMut, terms: &[i64]) {
    dst.put_i32(terms.len() as i32);
    for term in terms {
        dst.put_i64(*term);
    }
}

pub(crate) fn get_terms(src: &mut Bytes) -> Result<Vec<i64>, WireError> {
    let count = get_i32(src, "term count")?;
    if count < 0 {
        return Err(WireError::NegativeLength(count));
    }
    require(src, count as usize * 8, "log entry terms")?;
    let mut terms = Vec::with_capacity(count as usize);
    for _ in 0..count {
        terms.push(src.get_i64());
    }
    Ok(terms)
}
