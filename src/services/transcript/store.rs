use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::watch;

use super::types::{Message, MessageId, MessageStatus, NewMessage, Sender};

#[derive(Default)]
struct Transcript {
    messages: Vec<Message>,
    revision: u64,
}

struct MessageStoreInner {
    transcript: Mutex<Transcript>,
    changed: watch::Sender<u64>,
}

/// Ordered transcript. Ids start at 1 and equal the 1-based position.
///
/// Every mutation bumps a revision published on a `watch` channel, so the
/// presentation layer can re-render and scroll to the latest message.
#[derive(Clone)]
pub struct MessageStore {
    inner: Arc<MessageStoreInner>,
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageStore {
    pub fn new() -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            inner: Arc::new(MessageStoreInner {
                transcript: Mutex::new(Transcript::default()),
                changed,
            }),
        }
    }

    // NOTE: the lock is never held across .await, and a panic while holding it
    // cannot leave the Vec half-written, so a poisoned guard is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, Transcript> {
        self.inner
            .transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, transcript: &mut Transcript) {
        transcript.revision += 1;
        self.inner.changed.send_replace(transcript.revision);
    }

    /// Insert at the tail and return the assigned id. User messages start as `Sent`.
    pub fn append(&self, message: NewMessage) -> MessageId {
        let mut transcript = self.lock();
        let id = transcript.messages.len() as MessageId + 1;
        let status = match message.sender {
            Sender::User => Some(MessageStatus::Sent),
            Sender::Bot => None,
        };
        transcript.messages.push(Message {
            id,
            text: message.text,
            sender: message.sender,
            created_at_ms: now_ms(),
            status,
            attachment: message.attachment,
            avatar: message.avatar,
        });
        self.publish(&mut transcript);
        id
    }

    /// Move a user message forward to `target`.
    ///
    /// No-op (returns `false`) for bot messages, unknown ids, and targets that
    /// are not strictly later than the current status.
    pub fn advance_status(&self, id: MessageId, target: MessageStatus) -> bool {
        let mut transcript = self.lock();
        let Some(message) = index_of(id).and_then(|idx| transcript.messages.get_mut(idx)) else {
            return false;
        };
        if !message.is_user() {
            return false;
        }
        match message.status {
            Some(current) if target > current => {
                message.status = Some(target);
            }
            _ => return false,
        }
        log::debug!("message {} advanced to {:?}", id, target);
        self.publish(&mut transcript);
        true
    }

    pub fn latest(&self) -> Option<Message> {
        self.lock().messages.last().cloned()
    }

    pub fn get(&self, id: MessageId) -> Option<Message> {
        let transcript = self.lock();
        index_of(id).and_then(|idx| transcript.messages.get(idx).cloned())
    }

    pub fn status_of(&self, id: MessageId) -> Option<MessageStatus> {
        self.get(id).and_then(|m| m.status)
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receives the revision number after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.changed.subscribe()
    }
}

fn index_of(id: MessageId) -> Option<usize> {
    usize::try_from(id).ok()?.checked_sub(1)
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
