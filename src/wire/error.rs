use crate::wire::content_type::ContentType;

/// Faults in the inbound byte stream. All of these are connection-fatal:
/// the stream is corrupt, and the only recovery is to tear the connection
/// down and reconnect. None are retried.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("Unknown content type tag: {0:#04x}")]
    UnknownContentType(u8),

    #[error("Unknown raft message type ordinal: {0}")]
    UnknownMessageType(i32),

    #[error("Unknown replicated content kind: {0:#04x}")]
    UnknownContentKind(u8),

    #[error("Content type {0:?} is not a standalone unit")]
    UnexpectedUnit(ContentType),

    #[error("Truncated while reading {field}: {needed} more bytes required")]
    Truncated {
        field: &'static str,
        needed: usize,
    },

    #[error("Unit has {remaining} trailing bytes after {unit}")]
    TrailingBytes {
        unit: &'static str,
        remaining: usize,
    },

    #[error("Negative length field on the wire: {0}")]
    NegativeLength(i32),

    #[error("First chunk received while a frame is still in progress")]
    ChunkAlreadyInProgress,

    #[error("Continuation chunk received with no frame in progress")]
    ChunkNotInProgress,

    #[error("A message creator arrived while another is still pending")]
    DoublePendingCreator,

    #[error("Decoded {part} with no pending message creator")]
    PartWithoutCreator { part: &'static str },

    #[error("More {part} arrived than the pending message declared")]
    ExcessPart { part: &'static str },

    #[error("Message emitted with {terms} terms and {contents} contents left unconsumed")]
    LeftoverParts { terms: usize, contents: usize },

    #[error("Replicated content nested deeper than {limit} levels")]
    NestingTooDeep { limit: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
