//! The conversation transcript: an append-only, observable list of messages.

mod store;
mod types;

pub use store::MessageStore;
pub use types::{Message, MessageId, MessageStatus, NewMessage, Sender};
