use crate::wire::content_type::ContentType;
use crate::wire::error::WireError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

// Chunk flag bits. `first` chunks carry the unit's content-type tag.
const FLAG_LAST: u8 = 0x1;
const FLAG_FIRST: u8 = 0x2;

const CHUNK_HEADER_LEN: usize = 1 + 4;

/// One chunk as read off the wire:
/// `[flags: u8][length: i32][tag: u8, first chunk only][payload: length bytes]`.
#[derive(Debug)]
pub(crate) struct Chunk {
    pub first: bool,
    pub last: bool,
    pub tag: Option<u8>,
    pub payload: Bytes,
}

/// A fully reassembled logical unit.
#[derive(Debug)]
pub struct ComposedContent {
    pub content_type: ContentType,
    pub bytes: Bytes,
}

/// ChunkAssembler rebuilds one logical unit from its chunks. Chunk sizes are
/// not known in advance; payloads accumulate into a growable buffer. Only
/// one unit is ever in flight per connection; interleaved units are stream
/// corruption.
pub struct ChunkAssembler {
    in_progress: Option<PartialUnit>,
}

struct PartialUnit {
    content_type: ContentType,
    buffer: BytesMut,
}

impl ChunkAssembler {
    pub fn new() -> Self {
        ChunkAssembler { in_progress: None }
    }

    /// Feed one chunk. Returns the composed unit when the last chunk
    /// arrives, `None` while more are expected. `content_type` is the
    /// dispatched tag of a first chunk and must be absent otherwise.
    pub(crate) fn handle(
        &mut self,
        chunk: Chunk,
        content_type: Option<ContentType>,
    ) -> Result<Option<ComposedContent>, WireError> {
        if chunk.first {
            if self.in_progress.is_some() {
                return Err(WireError::ChunkAlreadyInProgress);
            }
            let content_type = content_type.expect("first chunk dispatched without a tag");

            if chunk.last {
                // Single-chunk unit; no state retained.
                return Ok(Some(ComposedContent {
                    content_type,
                    bytes: chunk.payload,
                }));
            }

            let mut buffer = BytesMut::with_capacity(chunk.payload.len() * 2);
            buffer.extend_from_slice(&chunk.payload);
            self.in_progress = Some(PartialUnit {
                content_type,
                buffer,
            });
            Ok(None)
        } else {
            let mut partial = self
                .in_progress
                .take()
                .ok_or(WireError::ChunkNotInProgress)?;
            partial.buffer.extend_from_slice(&chunk.payload);

            if chunk.last {
                Ok(Some(ComposedContent {
                    content_type: partial.content_type,
                    bytes: partial.buffer.freeze(),
                }))
            } else {
                self.in_progress = Some(partial);
                Ok(None)
            }
        }
    }

    pub fn frame_in_progress(&self) -> bool {
        self.in_progress.is_some()
    }

    /// Release any partial frame, e.g. when the connection resets mid-unit.
    pub fn close(&mut self) {
        self.in_progress = None;
    }
}

impl Default for ChunkAssembler {
    fn default() -> Self {
        ChunkAssembler::new()
    }
}

/// Try to parse one complete chunk off the front of `src`. Leaves `src`
/// untouched when the chunk is not fully buffered yet.
pub(crate) fn try_read_chunk(src: &mut BytesMut) -> Result<Option<Chunk>, WireError> {
    if src.len() < CHUNK_HEADER_LEN {
        return Ok(None);
    }

    let flags = src[0];
    let length = i32::from_be_bytes([src[1], src[2], src[3], src[4]]);
    if length < 0 {
        return Err(WireError::NegativeLength(length));
    }

    let first = flags & FLAG_FIRST != 0;
    let total = CHUNK_HEADER_LEN + usize::from(first) + length as usize;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(CHUNK_HEADER_LEN);
    let tag = if first { Some(src.get_u8()) } else { None };
    let payload = src.split_to(length as usize).freeze();

    Ok(Some(Chunk {
        first,
        last: flags & FLAG_LAST != 0,
        tag,
        payload,
    }))
}

/// Write one unit as chunks of at most `max_chunk_size` payload bytes.
pub(crate) fn write_unit(dst: &mut BytesMut, tag: u8, payload: &[u8], max_chunk_size: usize) {
    debug_assert!(max_chunk_size > 0, "chunk size must be positive");

    let mut offset = 0;
    let mut first = true;
    loop {
        let take = (payload.len() - offset).min(max_chunk_size);
        let last = offset + take == payload.len();

        let mut flags = 0u8;
        if first {
            flags |= FLAG_FIRST;
        }
        if last {
            flags |= FLAG_LAST;
        }

        dst.put_u8(flags);
        dst.put_i32(take as i32);
        if first {
            dst.put_u8(tag);
        }
        dst.put_slice(&payload[offset..offset + take]);

        offset += take;
        first = false;
        if last {
            break;
        }
    }
}
