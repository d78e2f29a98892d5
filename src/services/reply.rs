//! Simulated bot replies and per-message delivery receipts.
//!
//! Each user send gets two single-shot timers keyed by its message id: a
//! delivery timer (`sent -> delivered`) and a reply timer that appends the bot
//! message. Reply timers are independent, so overlapping sends each complete
//! on their own; `bot_typing` stays true while any reply is pending.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

use super::profile::ConversationProfile;
use super::transcript::{MessageId, MessageStatus, MessageStore, NewMessage};
use super::typing::TypingMonitor;

pub fn greeting(name: &str) -> String {
    format!("Nice to meet you, {name}! How can I help you today?")
}

pub fn echo(text: &str) -> String {
    format!("You said: {text}")
}

/// The bot's answer to `text`.
///
/// `name_captured` is whether this send just became the user's name (see
/// [`ConversationProfile::capture_name`]); `profile` is the state after that.
pub fn compose_reply(profile: &ConversationProfile, name_captured: bool, text: &str) -> String {
    if name_captured {
        greeting(&profile.user_name)
    } else {
        echo(text)
    }
}

#[derive(Default)]
struct TimerRegistry {
    replies: HashMap<MessageId, JoinHandle<()>>,
    deliveries: HashMap<MessageId, JoinHandle<()>>,
    shut_down: bool,
}

struct ReplyInner {
    store: MessageStore,
    typing: TypingMonitor,
    // NOTE: lock order is registry -> store/typing; neither of those ever calls back here.
    registry: Mutex<TimerRegistry>,
}

#[derive(Clone)]
pub struct ReplyScheduler {
    inner: Arc<ReplyInner>,
}

impl ReplyScheduler {
    pub fn new(store: MessageStore, typing: TypingMonitor) -> Self {
        Self {
            inner: Arc::new(ReplyInner {
                store,
                typing,
                registry: Mutex::new(TimerRegistry::default()),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TimerRegistry> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `text` as a bot message once `delay` has elapsed.
    pub fn schedule_reply(&self, in_reply_to: MessageId, text: String, delay: Duration) {
        let mut registry = self.lock();
        if registry.shut_down {
            return;
        }

        let scheduler = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            scheduler.fire_reply(in_reply_to, text);
        });
        if let Some(previous) = registry.replies.insert(in_reply_to, handle) {
            previous.abort();
        }
        self.inner.typing.set_bot_typing(true);
    }

    fn fire_reply(&self, in_reply_to: MessageId, text: String) {
        let mut registry = self.lock();
        if registry.shut_down || registry.replies.remove(&in_reply_to).is_none() {
            log::debug!("reply to message {} was cancelled", in_reply_to);
            return;
        }

        let id = self.inner.store.append(NewMessage::bot(text));
        // The bot has seen the message it answers.
        self.inner
            .store
            .advance_status(in_reply_to, MessageStatus::Read);
        self.inner.typing.set_bot_typing(!registry.replies.is_empty());
        log::debug!("bot reply {} appended for message {}", id, in_reply_to);
    }

    /// Advance `id` to `delivered` after `delay`, if it is still `sent` then.
    ///
    /// Ignored for anything that is not a freshly sent user message.
    pub fn schedule_delivery(&self, id: MessageId, delay: Duration) {
        if self.inner.store.status_of(id) != Some(MessageStatus::Sent) {
            return;
        }

        let mut registry = self.lock();
        if registry.shut_down || registry.deliveries.contains_key(&id) {
            return;
        }

        let scheduler = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            scheduler.fire_delivery(id);
        });
        registry.deliveries.insert(id, handle);
    }

    fn fire_delivery(&self, id: MessageId) {
        let mut registry = self.lock();
        if registry.shut_down || registry.deliveries.remove(&id).is_none() {
            return;
        }
        // advance_status is a no-op when an external actor already moved it past `sent`.
        if !self
            .inner
            .store
            .advance_status(id, MessageStatus::Delivered)
        {
            log::debug!("message {} already past sent; delivery skipped", id);
        }
    }

    pub fn pending_replies(&self) -> usize {
        self.lock().replies.len()
    }

    pub fn pending_deliveries(&self) -> usize {
        self.lock().deliveries.len()
    }

    /// Abort every pending timer; later schedules are ignored.
    pub fn shutdown(&self) {
        let mut registry = self.lock();
        registry.shut_down = true;
        let cancelled = registry.replies.len() + registry.deliveries.len();
        for (_, handle) in registry.replies.drain() {
            handle.abort();
        }
        for (_, handle) in registry.deliveries.drain() {
            handle.abort();
        }
        self.inner.typing.set_bot_typing(false);
        if cancelled > 0 {
            log::info!("reply scheduler stopped; {} timers cancelled", cancelled);
        }
    }
}
