use crate::wire::error::WireError;

/// One-byte discriminator preceding each logical unit on the wire. Codes
/// are wire protocol; do not renumber.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    /// Phase marker: the next byte on the wire is itself a content type.
    ContentType = 0,
    ReplicatedContent = 1,
    RaftLogEntryTerms = 2,
    Message = 3,
    /// Phase marker for a bare message-type announcement.
    MessageType = 4,
}

impl ContentType {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<ContentType, WireError> {
        match code {
            0 => Ok(ContentType::ContentType),
            1 => Ok(ContentType::ReplicatedContent),
            2 => Ok(ContentType::RaftLogEntryTerms),
            3 => Ok(ContentType::Message),
            4 => Ok(ContentType::MessageType),
            other => Err(WireError::UnknownContentType(other)),
        }
    }
}

/// Protocol phase of the inbound pipeline: either the next unit's tag byte
/// is due, or bytes belong to a unit already being reassembled and pass
/// through untyped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Expect {
    ContentTypeTag,
    Passthrough,
}

/// ContentTypeDispatcher consumes the tag byte at each unit boundary and
/// decides which decoder the unit's bytes belong to. Decoupling "what kind
/// of thing comes next" from "how to decode that thing" keeps the per-type
/// decoders free of phase handling.
pub struct ContentTypeDispatcher {
    expecting: Expect,
}

impl ContentTypeDispatcher {
    pub fn new() -> Self {
        ContentTypeDispatcher {
            expecting: Expect::ContentTypeTag,
        }
    }

    /// Consume the tag byte of a unit that is starting. An unknown byte is
    /// stream corruption; the connection must be torn down.
    pub fn dispatch(&mut self, tag_byte: u8) -> Result<ContentType, WireError> {
        debug_assert_eq!(
            Expect::ContentTypeTag,
            self.expecting,
            "tag byte consumed mid-unit"
        );
        let content_type = ContentType::from_code(tag_byte)?;
        self.expecting = Expect::Passthrough;
        Ok(content_type)
    }

    /// The current unit has been fully reassembled; the next byte on the
    /// wire is a tag again.
    pub fn unit_complete(&mut self) {
        self.expecting = Expect::ContentTypeTag;
    }
}

impl Default for ContentTypeDispatcher {
    fn default() -> Self {
        ContentTypeDispatcher::new()
    }
}
