use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

use crate::services::anchor_layout::{DEFAULT_VIEWPORT, Size};
use crate::services::attachment::AttachmentView;
use crate::services::drag::PanelPosition;
use crate::services::profile::{Avatar, ConversationProfile};
use crate::services::transcript::Message;
use crate::services::typing::TypingState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Error,
}

/// Transient status line (validation failure, send-email confirmation, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

/// UI state owned by the controller: visibility, profile, compose box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetState {
    pub open: bool,
    pub profile: ConversationProfile,
    pub emoji_picker_open: bool,
    pub draft: String,
    pub viewport: Size,
    pub notice: Option<Notice>,
}

impl Default for WidgetState {
    fn default() -> Self {
        Self {
            open: false,
            profile: ConversationProfile::default(),
            emoji_picker_open: false,
            draft: String::new(),
            viewport: DEFAULT_VIEWPORT,
            notice: None,
        }
    }
}

/// Every mutation of [`WidgetState`] is one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetAction {
    Open,
    Close,
    ToggleTheme,
    SetAvatar(Avatar),
    SetUserName(String),
    /// Adopt the text as the user's name if none is known yet.
    CaptureName(String),
    ToggleEmojiPicker,
    InsertEmoji(String),
    SetDraft(String),
    SetViewport(Size),
    ShowNotice(Notice),
    DismissNotice,
}

impl WidgetState {
    /// Apply `action`; returns `true` if anything changed.
    pub fn apply(&mut self, action: WidgetAction) -> bool {
        match action {
            WidgetAction::Open => replace(&mut self.open, true),
            WidgetAction::Close => {
                let closed = replace(&mut self.open, false);
                let picker = replace(&mut self.emoji_picker_open, false);
                closed || picker
            }
            WidgetAction::ToggleTheme => {
                self.profile.theme = self.profile.theme.toggled();
                true
            }
            WidgetAction::SetAvatar(avatar) => replace(&mut self.profile.user_avatar, avatar),
            WidgetAction::SetUserName(name) => {
                replace(&mut self.profile.user_name, name.trim().to_string())
            }
            WidgetAction::CaptureName(text) => self.profile.capture_name(&text),
            WidgetAction::ToggleEmojiPicker => {
                self.emoji_picker_open = !self.emoji_picker_open;
                true
            }
            WidgetAction::InsertEmoji(glyph) => {
                if glyph.is_empty() {
                    return false;
                }
                self.draft.push_str(&glyph);
                self.emoji_picker_open = false;
                true
            }
            WidgetAction::SetDraft(text) => replace(&mut self.draft, text),
            WidgetAction::SetViewport(size) => {
                if !(size.width.is_finite() && size.height.is_finite())
                    || size.width <= 0.0
                    || size.height <= 0.0
                {
                    return false;
                }
                replace(&mut self.viewport, size)
            }
            WidgetAction::ShowNotice(notice) => replace(&mut self.notice, Some(notice)),
            WidgetAction::DismissNotice => replace(&mut self.notice, None),
        }
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// Everything the presentation layer needs to render one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSnapshot {
    pub state: WidgetState,
    pub messages: Vec<Message>,
    pub typing: TypingState,
    pub position: PanelPosition,
    pub attachment: AttachmentView,
}

#[derive(Clone)]
pub(crate) struct WidgetStateStore {
    inner: Arc<WidgetStateStoreInner>,
}

struct WidgetStateStoreInner {
    state: Mutex<WidgetState>,
    changed: watch::Sender<WidgetState>,
}

impl WidgetStateStore {
    pub(crate) fn new() -> Self {
        let (changed, _) = watch::channel(WidgetState::default());
        Self {
            inner: Arc::new(WidgetStateStoreInner {
                state: Mutex::new(WidgetState::default()),
                changed,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WidgetState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn dispatch(&self, action: WidgetAction) -> bool {
        let mut state = self.lock();
        let changed = state.apply(action);
        if changed {
            self.inner.changed.send_replace(state.clone());
        }
        changed
    }

    pub(crate) fn get(&self) -> WidgetState {
        self.lock().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<WidgetState> {
        self.inner.changed.subscribe()
    }
}
