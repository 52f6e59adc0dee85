//! UseCase layer error definitions.

use thiserror::Error;

use crate::domain::ValueObjectError;
use crate::domain::value_object::CHAT_TEXT_MAX_CHARS;

/// Errors reported to the sender of a chat message.
///
/// All variants are recoverable: the sender receives a scoped `error` event
/// and the connection stays open.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Message is empty after trimming
    #[error("message cannot be empty")]
    EmptyMessage,

    /// Message exceeds the maximum length
    #[error("message cannot exceed {max} characters")]
    MessageTooLong { max: usize },

    /// Too many messages inside the current rate window
    #[error("you are sending messages too quickly, please slow down")]
    RateLimitExceeded,
}

impl From<ValueObjectError> for ChatError {
    fn from(err: ValueObjectError) -> Self {
        match err {
            ValueObjectError::ChatTextTooLong { .. } => ChatError::MessageTooLong {
                max: CHAT_TEXT_MAX_CHARS,
            },
            _ => ChatError::EmptyMessage,
        }
    }
}
