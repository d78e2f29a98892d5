//! Headless core of an embeddable floating chat widget.
//!
//! A host shell (web view, native window, TUI) drives a [`WidgetController`]
//! with user events and renders whatever its `subscribe_*` channels or
//! [`WidgetController::snapshot`] report. Everything here is UI-agnostic.

mod controller;
mod error;
pub mod services;
mod widget_state;

pub use controller::WidgetController;
pub use error::WidgetError;
pub use services::attachment::{AttachmentBackend, AttachmentView, HttpBackend, SelectedFile};
pub use services::config::WidgetConfig;
pub use services::profile::{Avatar, ConversationProfile, Theme};
pub use services::transcript::{Message, MessageId, MessageStatus, Sender};
pub use services::typing::TypingState;
pub use widget_state::{Notice, NoticeKind, WidgetAction, WidgetSnapshot, WidgetState};
