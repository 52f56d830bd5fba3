use crate::messages::ClusterIdAwareMessage;
use crate::replication::ReplicatedContent;
use crate::wire::error::WireError;
use crate::wire::message_codec::MessageCreator;
use std::collections::VecDeque;

/// MessageComposer collects a message's variable-length parts and emits the
/// finished message once the shape its creator declared is satisfied.
///
/// States: waiting for a creator, accumulating parts, emit, and back to
/// waiting. Terms and contents may interleave freely after their creator,
/// but any part that does not fit the declared shape is stream corruption
/// and fatal. A silent mismatch here would mean attributing one message's
/// payload to another.
pub struct MessageComposer {
    logger: slog::Logger,
    pending: Option<MessageCreator>,
    queued_terms: VecDeque<i64>,
    queued_contents: VecDeque<ReplicatedContent>,
}

impl MessageComposer {
    pub fn new(logger: slog::Logger) -> Self {
        MessageComposer {
            logger,
            pending: None,
            queued_terms: VecDeque::new(),
            queued_contents: VecDeque::new(),
        }
    }

    pub(crate) fn push_creator(
        &mut self,
        creator: MessageCreator,
    ) -> Result<Option<ClusterIdAwareMessage>, WireError> {
        if self.pending.is_some() {
            slog::error!(
                self.logger,
                "Message creator arrived while another is still pending"
            );
            return Err(WireError::DoublePendingCreator);
        }
        self.pending = Some(creator);
        self.try_compose()
    }

    pub(crate) fn push_terms(
        &mut self,
        terms: Vec<i64>,
    ) -> Result<Option<ClusterIdAwareMessage>, WireError> {
        let creator = self.pending.as_ref().ok_or(WireError::PartWithoutCreator {
            part: "log entry terms",
        })?;
        if self.queued_terms.len() + terms.len() > creator.terms_expected() {
            return Err(WireError::ExcessPart {
                part: "log entry terms",
            });
        }
        self.queued_terms.extend(terms);
        self.try_compose()
    }

    pub(crate) fn push_content(
        &mut self,
        content: ReplicatedContent,
    ) -> Result<Option<ClusterIdAwareMessage>, WireError> {
        let creator = self.pending.as_ref().ok_or(WireError::PartWithoutCreator {
            part: "replicated content",
        })?;
        if self.queued_contents.len() + 1 > creator.contents_expected() {
            return Err(WireError::ExcessPart {
                part: "replicated content",
            });
        }
        self.queued_contents.push_back(content);
        self.try_compose()
    }

    fn try_compose(&mut self) -> Result<Option<ClusterIdAwareMessage>, WireError> {
        let satisfied = match &self.pending {
            Some(creator) => {
                self.queued_terms.len() == creator.terms_expected()
                    && self.queued_contents.len() == creator.contents_expected()
            }
            None => false,
        };
        if !satisfied {
            return Ok(None);
        }

        let creator = self.pending.take().expect("satisfied implies pending");
        let message = creator.create(&mut self.queued_terms, &mut self.queued_contents);

        // The declared part counts must account for everything that arrived.
        if !self.queued_terms.is_empty() || !self.queued_contents.is_empty() {
            return Err(WireError::LeftoverParts {
                terms: self.queued_terms.len(),
                contents: self.queued_contents.len(),
            });
        }

        Ok(Some(message))
    }

    /// Drop all buffered state on connection teardown.
    pub fn close(&mut self) {
        self.pending = None;
        self.queued_terms.clear();
        self.queued_contents.clear();
    }
}
