mod chunk;
mod composer;
mod content_type;
mod error;
mod marshal;
mod message_codec;

pub use chunk::ChunkAssembler;
pub use chunk::ComposedContent;
pub use composer::MessageComposer;
pub use content_type::ContentType;
pub use content_type::ContentTypeDispatcher;
pub use error::WireError;
pub use message_codec::MessageCreator;
pub use message_codec::RaftWireDecoder;
pub use message_codec::RaftWireEncoder;
