use crate::cluster::ClusterId;
use crate::messages::{
    AppendEntriesRequest, AppendEntriesResponse, ClusterIdAwareMessage, Heartbeat,
    HeartbeatResponse, LogCompactionInfo, LogEntry, MessageType, NewEntryBatchRequest,
    NewEntryRequest, PreVoteRequest, PreVoteResponse, RaftMessage, VoteRequest, VoteResponse,
};
use crate::replication::ReplicatedContent;
use crate::wire::chunk::{try_read_chunk, write_unit, ChunkAssembler, ComposedContent};
use crate::wire::composer::MessageComposer;
use crate::wire::content_type::{ContentType, ContentTypeDispatcher};
use crate::wire::error::WireError;
use crate::wire::marshal;
use crate::cluster::MemberId;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::VecDeque;
use tokio_util::codec::{Decoder, Encoder};

/// Everything decoded from one message unit, plus the declared shape of the
/// variable parts still to arrive on the wire.
#[derive(Debug)]
pub struct MessageCreator {
    cluster_id: ClusterId,
    kind: CreatorKind,
}

#[derive(Debug)]
enum CreatorKind {
    /// The message had no variable parts and is ready as-is.
    Complete(RaftMessage),
    AppendEntriesRequest {
        from: MemberId,
        leader_term: i64,
        prev_log_index: i64,
        prev_log_term: i64,
        leader_commit: i64,
        /// content_flags[i] says whether entry i carries a content payload;
        /// entries a fresh leader appends to assert its term do not.
        content_flags: Vec<bool>,
    },
    NewEntryRequest {
        from: MemberId,
    },
    NewEntryBatchRequest {
        from: MemberId,
        batch_size: usize,
    },
}

impl MessageCreator {
    /// Number of log-entry terms this message still needs from the wire.
    pub(crate) fn terms_expected(&self) -> usize {
        match &self.kind {
            CreatorKind::AppendEntriesRequest { content_flags, .. } => content_flags.len(),
            _ => 0,
        }
    }

    /// Number of replicated-content payloads this message still needs.
    pub(crate) fn contents_expected(&self) -> usize {
        match &self.kind {
            CreatorKind::Complete(_) => 0,
            CreatorKind::AppendEntriesRequest { content_flags, .. } => {
                content_flags.iter().filter(|flag| **flag).count()
            }
            CreatorKind::NewEntryRequest { .. } => 1,
            CreatorKind::NewEntryBatchRequest { batch_size, .. } => *batch_size,
        }
    }

    /// Build the finished message from exactly the declared parts. The
    /// composer verifies the counts before calling.
    pub(crate) fn create(
        self,
        terms: &mut VecDeque<i64>,
        contents: &mut VecDeque<ReplicatedContent>,
    ) -> ClusterIdAwareMessage {
        let message = match self.kind {
            CreatorKind::Complete(message) => message,
            CreatorKind::AppendEntriesRequest {
                from,
                leader_term,
                prev_log_index,
                prev_log_term,
                leader_commit,
                content_flags,
            } => {
                let entries = content_flags
                    .iter()
                    .map(|has_content| LogEntry {
                        term: terms.pop_front().expect("composer verified term count"),
                        content: if *has_content {
                            Some(
                                contents
                                    .pop_front()
                                    .expect("composer verified content count"),
                            )
                        } else {
                            None
                        },
                    })
                    .collect();
                RaftMessage::AppendEntriesRequest(AppendEntriesRequest {
                    from,
                    leader_term,
                    prev_log_index,
                    prev_log_term,
                    leader_commit,
                    entries,
                })
            }
            CreatorKind::NewEntryRequest { from } => RaftMessage::NewEntryRequest(NewEntryRequest {
                from,
                content: contents
                    .pop_front()
                    .expect("composer verified content count"),
            }),
            CreatorKind::NewEntryBatchRequest { from, batch_size } => {
                let batch = (0..batch_size)
                    .map(|_| {
                        contents
                            .pop_front()
                            .expect("composer verified content count")
                    })
                    .collect();
                RaftMessage::NewEntryBatchRequest(NewEntryBatchRequest {
                    from,
                    contents: batch,
                })
            }
        };

        ClusterIdAwareMessage {
            cluster_id: self.cluster_id,
            message,
        }
    }
}

/// Decode one Message unit: fixed header, then type-specific fixed fields.
/// Variable parts are never read here; they arrive as their own units.
pub(crate) fn decode_message_unit(mut src: Bytes) -> Result<MessageCreator, WireError> {
    let cluster_id = marshal::get_cluster_id(&mut src, "cluster id")?;
    let ordinal = marshal::get_i32(&mut src, "message type ordinal")?;
    let message_type =
        MessageType::from_ordinal(ordinal).ok_or(WireError::UnknownMessageType(ordinal))?;
    let from = marshal::get_member_id(&mut src, "sender")?;

    let kind = match message_type {
        MessageType::VoteRequest => CreatorKind::Complete(RaftMessage::VoteRequest(VoteRequest {
            from,
            term: marshal::get_i64(&mut src, "term")?,
            candidate: marshal::get_member_id(&mut src, "candidate")?,
            last_log_index: marshal::get_i64(&mut src, "last log index")?,
            last_log_term: marshal::get_i64(&mut src, "last log term")?,
        })),
        MessageType::VoteResponse => {
            CreatorKind::Complete(RaftMessage::VoteResponse(VoteResponse {
                from,
                term: marshal::get_i64(&mut src, "term")?,
                vote_granted: marshal::get_bool(&mut src, "vote granted")?,
            }))
        }
        MessageType::PreVoteRequest => {
            CreatorKind::Complete(RaftMessage::PreVoteRequest(PreVoteRequest {
                from,
                term: marshal::get_i64(&mut src, "term")?,
                candidate: marshal::get_member_id(&mut src, "candidate")?,
                last_log_index: marshal::get_i64(&mut src, "last log index")?,
                last_log_term: marshal::get_i64(&mut src, "last log term")?,
            }))
        }
        MessageType::PreVoteResponse => {
            CreatorKind::Complete(RaftMessage::PreVoteResponse(PreVoteResponse {
                from,
                term: marshal::get_i64(&mut src, "term")?,
                vote_granted: marshal::get_bool(&mut src, "vote granted")?,
            }))
        }
        MessageType::AppendEntriesRequest => {
            let leader_term = marshal::get_i64(&mut src, "leader term")?;
            let prev_log_index = marshal::get_i64(&mut src, "prev log index")?;
            let prev_log_term = marshal::get_i64(&mut src, "prev log term")?;
            let leader_commit = marshal::get_i64(&mut src, "leader commit")?;
            let entry_count = marshal::get_i32(&mut src, "entry count")?;
            if entry_count < 0 {
                return Err(WireError::NegativeLength(entry_count));
            }
            let mut content_flags = Vec::with_capacity(entry_count as usize);
            for _ in 0..entry_count {
                content_flags.push(marshal::get_bool(&mut src, "entry content flag")?);
            }
            CreatorKind::AppendEntriesRequest {
                from,
                leader_term,
                prev_log_index,
                prev_log_term,
                leader_commit,
                content_flags,
            }
        }
        MessageType::AppendEntriesResponse => {
            CreatorKind::Complete(RaftMessage::AppendEntriesResponse(AppendEntriesResponse {
                from,
                term: marshal::get_i64(&mut src, "term")?,
                success: marshal::get_bool(&mut src, "success")?,
                match_index: marshal::get_i64(&mut src, "match index")?,
                append_index: marshal::get_i64(&mut src, "append index")?,
            }))
        }
        MessageType::Heartbeat => CreatorKind::Complete(RaftMessage::Heartbeat(Heartbeat {
            from,
            leader_term: marshal::get_i64(&mut src, "leader term")?,
            commit_index: marshal::get_i64(&mut src, "commit index")?,
            commit_index_term: marshal::get_i64(&mut src, "commit index term")?,
        })),
        MessageType::HeartbeatResponse => {
            CreatorKind::Complete(RaftMessage::HeartbeatResponse(HeartbeatResponse { from }))
        }
        MessageType::LogCompactionInfo => {
            CreatorKind::Complete(RaftMessage::LogCompactionInfo(LogCompactionInfo {
                from,
                leader_term: marshal::get_i64(&mut src, "leader term")?,
                prev_index: marshal::get_i64(&mut src, "prev index")?,
            }))
        }
        MessageType::NewEntryRequest => CreatorKind::NewEntryRequest { from },
        MessageType::NewEntryBatchRequest => {
            let batch_size = marshal::get_i32(&mut src, "batch size")?;
            if batch_size < 0 {
                return Err(WireError::NegativeLength(batch_size));
            }
            CreatorKind::NewEntryBatchRequest {
                from,
                batch_size: batch_size as usize,
            }
        }
    };

    if src.has_remaining() {
        return Err(WireError::TrailingBytes {
            unit: "message header",
            remaining: src.remaining(),
        });
    }

    Ok(MessageCreator { cluster_id, kind })
}

/// Encode `message` as its wire units into `dst`: the message unit first,
/// then its log-entry terms and content payloads in the order the receiving
/// composer consumes them. Each unit is chunked at `max_chunk_size`.
pub(crate) fn encode_message(
    dst: &mut BytesMut,
    cluster_id: &ClusterId,
    message: &RaftMessage,
    max_chunk_size: usize,
) {
    let mut unit = BytesMut::new();
    marshal::put_cluster_id(&mut unit, cluster_id);
    unit.put_i32(message.message_type().ordinal());
    marshal::put_member_id(&mut unit, &message.sender());

    match message {
        RaftMessage::VoteRequest(m) => {
            unit.put_i64(m.term);
            marshal::put_member_id(&mut unit, &m.candidate);
            unit.put_i64(m.last_log_index);
            unit.put_i64(m.last_log_term);
        }
        RaftMessage::VoteResponse(m) => {
            unit.put_i64(m.term);
            unit.put_u8(m.vote_granted as u8);
        }
        RaftMessage::PreVoteRequest(m) => {
            unit.put_i64(m.term);
            marshal::put_member_id(&mut unit, &m.candidate);
            unit.put_i64(m.last_log_index);
            unit.put_i64(m.last_log_term);
        }
        RaftMessage::PreVoteResponse(m) => {
            unit.put_i64(m.term);
            unit.put_u8(m.vote_granted as u8);
        }
        RaftMessage::AppendEntriesRequest(m) => {
            unit.put_i64(m.leader_term);
            unit.put_i64(m.prev_log_index);
            unit.put_i64(m.prev_log_term);
            unit.put_i64(m.leader_commit);
            unit.put_i32(m.entries.len() as i32);
            for entry in &m.entries {
                unit.put_u8(entry.content.is_some() as u8);
            }
        }
        RaftMessage::AppendEntriesResponse(m) => {
            unit.put_i64(m.term);
            unit.put_u8(m.success as u8);
            unit.put_i64(m.match_index);
            unit.put_i64(m.append_index);
        }
        RaftMessage::Heartbeat(m) => {
            unit.put_i64(m.leader_term);
            unit.put_i64(m.commit_index);
            unit.put_i64(m.commit_index_term);
        }
        RaftMessage::HeartbeatResponse(_) => {}
        RaftMessage::LogCompactionInfo(m) => {
            unit.put_i64(m.leader_term);
            unit.put_i64(m.prev_index);
        }
        RaftMessage::NewEntryRequest(_) => {}
        RaftMessage::NewEntryBatchRequest(m) => {
            unit.put_i32(m.contents.len() as i32);
        }
    }
    write_unit(dst, ContentType::Message.code(), &unit, max_chunk_size);

    match message {
        RaftMessage::AppendEntriesRequest(m) => {
            if !m.entries.is_empty() {
                let terms: Vec<i64> = m.entries.iter().map(|entry| entry.term).collect();
                let mut terms_unit = BytesMut::new();
                marshal::put_terms(&mut terms_unit, &terms);
                write_unit(
                    dst,
                    ContentType::RaftLogEntryTerms.code(),
                    &terms_unit,
                    max_chunk_size,
                );

                for entry in &m.entries {
                    if let Some(content) = &entry.content {
                        write_content_unit(dst, content, max_chunk_size);
                    }
                }
            }
        }
        RaftMessage::NewEntryRequest(m) => write_content_unit(dst, &m.content, max_chunk_size),
        RaftMessage::NewEntryBatchRequest(m) => {
            for content in &m.contents {
                write_content_unit(dst, content, max_chunk_size);
            }
        }
        _ => {}
    }
}

fn write_content_unit(dst: &mut BytesMut, content: &ReplicatedContent, max_chunk_size: usize) {
    let mut unit = BytesMut::new();
    marshal::put_content(&mut unit, content);
    write_unit(
        dst,
        ContentType::ReplicatedContent.code(),
        &unit,
        max_chunk_size,
    );
}

/// RaftWireDecoder turns one connection's ordered byte stream into fully
/// composed raft messages. One instance per connection; never shared.
pub struct RaftWireDecoder {
    assembler: ChunkAssembler,
    dispatcher: ContentTypeDispatcher,
    composer: MessageComposer,
}

impl RaftWireDecoder {
    pub fn new(logger: slog::Logger) -> Self {
        RaftWireDecoder {
            assembler: ChunkAssembler::new(),
            dispatcher: ContentTypeDispatcher::new(),
            composer: MessageComposer::new(logger),
        }
    }

    /// Tear down mid-frame state when the connection closes.
    pub fn close(&mut self) {
        self.assembler.close();
        self.composer.close();
    }

    fn route_unit(
        &mut self,
        unit: ComposedContent,
    ) -> Result<Option<ClusterIdAwareMessage>, WireError> {
        match unit.content_type {
            ContentType::Message => {
                let creator = decode_message_unit(unit.bytes)?;
                self.composer.push_creator(creator)
            }
            ContentType::ReplicatedContent => {
                let mut bytes = unit.bytes;
                let content = marshal::get_content(&mut bytes)?;
                if bytes.has_remaining() {
                    return Err(WireError::TrailingBytes {
                        unit: "replicated content",
                        remaining: bytes.remaining(),
                    });
                }
                self.composer.push_content(content)
            }
            ContentType::RaftLogEntryTerms => {
                let mut bytes = unit.bytes;
                let terms = marshal::get_terms(&mut bytes)?;
                if bytes.has_remaining() {
                    return Err(WireError::TrailingBytes {
                        unit: "log entry terms",
                        remaining: bytes.remaining(),
                    });
                }
                self.composer.push_terms(terms)
            }
            // Phase markers never arrive as standalone units.
            ContentType::ContentType | ContentType::MessageType => {
                Err(WireError::UnexpectedUnit(unit.content_type))
            }
        }
    }
}

impl Decoder for RaftWireDecoder {
    type Item = ClusterIdAwareMessage;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while let Some(chunk) = try_read_chunk(src)? {
            // Reject an interleaved unit before its tag reaches the
            // dispatcher; the dispatcher is still mid-unit at this point.
            if chunk.first && self.assembler.frame_in_progress() {
                return Err(WireError::ChunkAlreadyInProgress);
            }
            let content_type = match chunk.tag {
                Some(tag_byte) => Some(self.dispatcher.dispatch(tag_byte)?),
                None => None,
            };

            if let Some(unit) = self.assembler.handle(chunk, content_type)? {
                self.dispatcher.unit_complete();
                if let Some(message) = self.route_unit(unit)? {
                    return Ok(Some(message));
                }
            }
        }
        Ok(None)
    }
}

/// RaftWireEncoder writes messages as chunked wire units.
pub struct RaftWireEncoder {
    max_chunk_size: usize,
}

impl RaftWireEncoder {
    pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

    pub fn new(max_chunk_size: usize) -> Self {
        assert!(max_chunk_size > 0, "chunk size must be positive");
        RaftWireEncoder { max_chunk_size }
    }
}

impl Default for RaftWireEncoder {
    fn default() -> Self {
        RaftWireEncoder::new(RaftWireEncoder::DEFAULT_CHUNK_SIZE)
    }
}

impl Encoder<ClusterIdAwareMessage> for RaftWireEncoder {
    type Error = WireError;

    fn encode(
        &mut self,
        item: ClusterIdAwareMessage,
        dst: &mut BytesMut,
    ) -> Result<(), Self::Error> {
        encode_message(dst, &item.cluster_id, &item.message, self.max_chunk_size);
        Ok(())
    }
}
