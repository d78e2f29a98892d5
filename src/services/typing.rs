use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// The two independent typing indicators. Both may be true at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingState {
    pub user_typing: bool,
    pub bot_typing: bool,
}

#[derive(Default)]
struct TypingSlot {
    flags: TypingState,
    quiet_timer: Option<JoinHandle<()>>,
    /// Bumped on every keystroke; a quiet timer only fires for its own generation.
    generation: u64,
    shut_down: bool,
}

struct TypingInner {
    slot: Mutex<TypingSlot>,
    changed: watch::Sender<TypingState>,
}

/// Debounced "user is typing" plus the bot flag owned by the reply scheduler.
#[derive(Clone)]
pub struct TypingMonitor {
    inner: Arc<TypingInner>,
}

impl Default for TypingMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl TypingMonitor {
    pub fn new() -> Self {
        let (changed, _) = watch::channel(TypingState::default());
        Self {
            inner: Arc::new(TypingInner {
                slot: Mutex::new(TypingSlot::default()),
                changed,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TypingSlot> {
        self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, flags: TypingState) {
        self.inner.changed.send_if_modified(|current| {
            if *current == flags {
                return false;
            }
            *current = flags;
            true
        });
    }

    /// Record an input change.
    ///
    /// Non-empty input sets `user_typing` and restarts the quiet timer; empty
    /// input (cleared draft, message sent) drops the flag immediately.
    pub fn input_changed(&self, text: &str, quiet_period: Duration) {
        let mut slot = self.lock();
        if slot.shut_down {
            return;
        }
        if let Some(timer) = slot.quiet_timer.take() {
            timer.abort();
        }
        slot.generation = slot.generation.wrapping_add(1);

        if text.is_empty() {
            slot.flags.user_typing = false;
            let flags = slot.flags;
            self.publish(flags);
            return;
        }

        slot.flags.user_typing = true;
        let generation = slot.generation;
        let monitor = self.clone();
        slot.quiet_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            monitor.quiet_period_elapsed(generation);
        }));
        let flags = slot.flags;
        self.publish(flags);
    }

    fn quiet_period_elapsed(&self, generation: u64) {
        let mut slot = self.lock();
        if slot.shut_down || slot.generation != generation {
            return;
        }
        slot.quiet_timer = None;
        slot.flags.user_typing = false;
        let flags = slot.flags;
        self.publish(flags);
    }

    pub fn set_bot_typing(&self, typing: bool) {
        let mut slot = self.lock();
        if slot.shut_down {
            return;
        }
        slot.flags.bot_typing = typing;
        let flags = slot.flags;
        self.publish(flags);
    }

    pub fn state(&self) -> TypingState {
        self.lock().flags
    }

    pub fn subscribe(&self) -> watch::Receiver<TypingState> {
        self.inner.changed.subscribe()
    }

    /// Cancel the quiet timer and clear both flags for good.
    pub fn shutdown(&self) {
        let mut slot = self.lock();
        slot.shut_down = true;
        if let Some(timer) = slot.quiet_timer.take() {
            timer.abort();
        }
        slot.flags = TypingState::default();
        self.publish(TypingState::default());
    }
}
