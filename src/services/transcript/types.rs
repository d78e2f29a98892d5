use serde::{Deserialize, Serialize};

use crate::services::attachment::AttachmentRef;
use crate::services::profile::Avatar;

/// Sequence number assigned by the store; also the transcript position.
pub type MessageId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// Delivery status of a user message. Ordered: `Sent < Delivered < Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    pub created_at_ms: u64,
    /// Always `Some` for user messages, `None` for bot messages.
    pub status: Option<MessageStatus>,
    pub attachment: Option<AttachmentRef>,
    /// Snapshot of the user's avatar at send time.
    pub avatar: Option<Avatar>,
}

impl Message {
    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// A message before the store assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub text: String,
    pub sender: Sender,
    pub attachment: Option<AttachmentRef>,
    pub avatar: Option<Avatar>,
}

impl NewMessage {
    pub fn user(text: impl Into<String>, avatar: Avatar) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
            attachment: None,
            avatar: Some(avatar),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Bot,
            attachment: None,
            avatar: None,
        }
    }

    pub fn with_attachment(mut self, attachment: AttachmentRef) -> Self {
        self.attachment = Some(attachment);
        self
    }
}
