//! Composition root: the single surface a host shell talks to.
//!
//! Timers keep running while the panel is closed (the transcript belongs to
//! the mounted instance, not to its visibility). [`WidgetController::unmount`],
//! also run on drop, cancels all of them.

use arc_swap::ArcSwap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

use crate::error::WidgetError;
use crate::services::anchor_layout::{AnchorMetrics, Point, Size, default_panel_position};
use crate::services::attachment::{
    AttachmentBackend, AttachmentPipeline, AttachmentView, HttpBackend, SelectedFile,
};
use crate::services::config::WidgetConfig;
use crate::services::drag::{DragController, PanelPosition};
use crate::services::profile::Avatar;
use crate::services::reply::{ReplyScheduler, compose_reply};
use crate::services::retry::RetryConfig;
use crate::services::transcript::{MessageId, MessageStatus, MessageStore, NewMessage};
use crate::services::typing::{TypingMonitor, TypingState};
use crate::widget_state::{Notice, WidgetAction, WidgetSnapshot, WidgetState, WidgetStateStore};

pub struct WidgetController {
    config: ArcSwap<WidgetConfig>,
    metrics: AnchorMetrics,
    state: WidgetStateStore,
    store: MessageStore,
    typing: TypingMonitor,
    replies: ReplyScheduler,
    attachments: AttachmentPipeline,
    drag: DragController,
    mounted: AtomicBool,
}

impl WidgetController {
    /// Controller talking to the HTTP collaborators named in `config`.
    pub fn new(config: WidgetConfig) -> Self {
        let backend = Arc::new(HttpBackend::new(&config, RetryConfig::from_env()));
        Self::with_backend(config, backend)
    }

    pub fn from_env() -> Self {
        Self::new(WidgetConfig::from_env())
    }

    pub fn with_backend(config: WidgetConfig, backend: Arc<dyn AttachmentBackend>) -> Self {
        let metrics = AnchorMetrics::default();
        let state = WidgetStateStore::new();
        let store = MessageStore::new();
        let typing = TypingMonitor::new();
        let replies = ReplyScheduler::new(store.clone(), typing.clone());
        let attachments = AttachmentPipeline::new(store.clone(), backend);
        let drag = DragController::new(default_panel_position(state.get().viewport, &metrics));

        Self {
            config: ArcSwap::from_pointee(config),
            metrics,
            state,
            store,
            typing,
            replies,
            attachments,
            drag,
            mounted: AtomicBool::new(true),
        }
    }

    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    fn default_position(&self) -> PanelPosition {
        default_panel_position(self.state.get().viewport, &self.metrics)
    }

    fn report<T>(&self, result: Result<T, WidgetError>) -> Result<T, WidgetError> {
        if let Err(err) = &result {
            self.state
                .dispatch(WidgetAction::ShowNotice(Notice::error(err.message())));
        }
        result
    }

    // ---- visibility -------------------------------------------------------

    pub fn open(&self) {
        if self.state.dispatch(WidgetAction::Open) {
            log::info!("chat widget opened");
        }
    }

    /// Hide the panel and re-anchor it for the next open.
    pub fn close(&self) {
        if self.state.dispatch(WidgetAction::Close) {
            log::info!("chat widget closed");
        }
        self.drag.reset(self.default_position());
    }

    pub fn toggle(&self) {
        if self.state.get().open {
            self.close();
        } else {
            self.open();
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.get().open
    }

    /// Record the host viewport; re-anchors the panel while it is closed.
    pub fn set_viewport(&self, width: f64, height: f64) {
        if self
            .state
            .dispatch(WidgetAction::SetViewport(Size::new(width, height)))
            && !self.is_open()
        {
            self.drag.reset(self.default_position());
        }
    }

    // ---- compose & send ---------------------------------------------------

    /// Update the compose box.
    pub fn set_input(&self, text: &str) {
        self.state.dispatch(WidgetAction::SetDraft(text.to_string()));
        self.typing
            .input_changed(text, self.config.load().typing_quiet_period());
    }

    /// Send `text` as the user. Blank text is ignored.
    ///
    /// The first message while no name is known becomes the user's name and is
    /// answered with a greeting; later ones are echoed.
    pub fn send(&self, text: &str) -> Option<MessageId> {
        if !self.is_mounted() || text.trim().is_empty() {
            return None;
        }
        let config = self.config.load();

        let captured = self
            .state
            .dispatch(WidgetAction::CaptureName(text.to_string()));
        let profile = self.state.get().profile;
        let reply = compose_reply(&profile, captured, text);

        let id = self
            .store
            .append(NewMessage::user(text, profile.user_avatar));
        self.replies.schedule_delivery(id, config.delivery_delay());
        self.replies.schedule_reply(id, reply, config.reply_delay());
        log::debug!("user message {} sent", id);
        Some(id)
    }

    /// Send the trimmed compose box contents and clear it.
    pub fn send_draft(&self) -> Option<MessageId> {
        let draft = self.state.get().draft;
        if draft.trim().is_empty() {
            return None;
        }
        self.set_input("");
        self.send(draft.trim())
    }

    /// External read receipt.
    pub fn mark_read(&self, id: MessageId) -> bool {
        self.store.advance_status(id, MessageStatus::Read)
    }

    // ---- profile ----------------------------------------------------------

    pub fn toggle_theme(&self) {
        self.state.dispatch(WidgetAction::ToggleTheme);
    }

    pub fn set_avatar(&self, avatar: Avatar) {
        self.state.dispatch(WidgetAction::SetAvatar(avatar));
    }

    pub fn set_user_name(&self, name: &str) {
        self.state
            .dispatch(WidgetAction::SetUserName(name.to_string()));
    }

    pub fn toggle_emoji_picker(&self) {
        self.state.dispatch(WidgetAction::ToggleEmojiPicker);
    }

    pub fn insert_emoji(&self, glyph: &str) {
        if self
            .state
            .dispatch(WidgetAction::InsertEmoji(glyph.to_string()))
        {
            let draft = self.state.get().draft;
            self.typing
                .input_changed(&draft, self.config.load().typing_quiet_period());
        }
    }

    pub fn dismiss_notice(&self) {
        self.state.dispatch(WidgetAction::DismissNotice);
    }

    // ---- dragging ---------------------------------------------------------

    pub fn pointer_down(&self, x: f64, y: f64) {
        self.drag.pointer_down(Point::new(x, y));
    }

    pub fn pointer_move(&self, x: f64, y: f64) -> bool {
        self.drag.pointer_move(Point::new(x, y))
    }

    pub fn pointer_up(&self) {
        self.drag.pointer_up();
    }

    /// Whether the host should currently route pointer-move/up events here.
    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    // ---- attachments ------------------------------------------------------

    pub fn select_file(&self, file: SelectedFile) -> Result<(), WidgetError> {
        let max_bytes = self.config.load().max_attachment_bytes;
        let result = self.attachments.select(file, max_bytes).map(|_| ());
        if result.is_ok() {
            self.state.dispatch(WidgetAction::DismissNotice);
        }
        self.report(result)
    }

    pub fn clear_file(&self) {
        self.attachments.clear();
    }

    /// Post the pending file into the transcript.
    pub fn commit_attachment(&self) -> Result<MessageId, WidgetError> {
        let result = self.attachments.commit_as_message();
        self.report(result)
    }

    /// `Ok(None)` means the result arrived for a replaced file or after unmount.
    pub async fn summarize_attachment(&self) -> Result<Option<MessageId>, WidgetError> {
        let result = self.attachments.summarize().await;
        if !self.is_mounted() {
            return Ok(None);
        }
        self.report(result)
    }

    pub fn set_recipient_email(&self, email: &str) {
        self.attachments.set_recipient_email(email);
    }

    /// Mail the pending file; the confirmation becomes the status line.
    pub async fn send_attachment_email(&self) -> Result<Option<String>, WidgetError> {
        let result = self.attachments.send_email().await;
        if !self.is_mounted() {
            return Ok(None);
        }
        if let Ok(Some(message)) = &result {
            self.state
                .dispatch(WidgetAction::ShowNotice(Notice::info(message.clone())));
        }
        self.report(result)
    }

    // ---- observation ------------------------------------------------------

    pub fn config(&self) -> Arc<WidgetConfig> {
        self.config.load_full()
    }

    /// Swap timing/limit settings; applies to timers scheduled afterwards.
    ///
    /// Collaborator URLs are fixed when the backend is built.
    pub fn reload_config(&self, config: WidgetConfig) {
        self.config.store(Arc::new(config));
    }

    pub fn state(&self) -> WidgetState {
        self.state.get()
    }

    pub fn snapshot(&self) -> WidgetSnapshot {
        WidgetSnapshot {
            state: self.state.get(),
            messages: self.store.messages(),
            typing: self.typing.state(),
            position: self.drag.position(),
            attachment: self.attachments.view(),
        }
    }

    /// [`Self::snapshot`] as JSON, for hosts bridging over a string channel.
    pub fn snapshot_json(&self) -> Result<String, WidgetError> {
        serde_json::to_string(&self.snapshot())
            .map_err(|e| WidgetError::internal(format!("Failed to serialize snapshot: {}", e)))
    }

    pub fn transcript(&self) -> &MessageStore {
        &self.store
    }

    pub fn typing(&self) -> TypingState {
        self.typing.state()
    }

    pub fn position(&self) -> PanelPosition {
        self.drag.position()
    }

    pub fn attachment(&self) -> AttachmentView {
        self.attachments.view()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<WidgetState> {
        self.state.subscribe()
    }

    pub fn subscribe_messages(&self) -> watch::Receiver<u64> {
        self.store.subscribe()
    }

    pub fn subscribe_typing(&self) -> watch::Receiver<TypingState> {
        self.typing.subscribe()
    }

    pub fn subscribe_position(&self) -> watch::Receiver<PanelPosition> {
        self.drag.subscribe()
    }

    pub fn subscribe_attachment(&self) -> watch::Receiver<AttachmentView> {
        self.attachments.subscribe()
    }

    // ---- teardown ---------------------------------------------------------

    /// Cancel every timer and in-flight completion. Idempotent.
    pub fn unmount(&self) {
        if !self.mounted.swap(false, Ordering::SeqCst) {
            return;
        }
        self.replies.shutdown();
        self.typing.shutdown();
        self.attachments.shutdown();
        self.drag.pointer_up();
        log::info!("chat widget unmounted");
    }
}

impl Drop for WidgetController {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::attachment::Attachment;
    use async_trait::async_trait;
    use std::time::Duration;

    struct OfflineBackend;

    #[async_trait]
    impl AttachmentBackend for OfflineBackend {
        async fn send_email(
            &self,
            _attachment: &Attachment,
            _email: &str,
        ) -> Result<String, WidgetError> {
            Err(WidgetError::network("Error sending file: offline"))
        }

        async fn summarize(&self, _attachment: &Attachment) -> Result<String, WidgetError> {
            Err(WidgetError::network("Error summarizing the file: offline"))
        }
    }

    fn controller() -> WidgetController {
        WidgetController::with_backend(WidgetConfig::default(), Arc::new(OfflineBackend))
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_reanchors_panel() {
        let widget = controller();
        widget.set_viewport(1280.0, 800.0);
        widget.open();
        let anchored = widget.position();

        widget.pointer_down(anchored.x + 10.0, anchored.y + 10.0);
        widget.pointer_move(300.0, 200.0);
        widget.pointer_up();
        assert_eq!(widget.position(), Point::new(290.0, 190.0));

        widget.close();
        widget.open();
        assert_eq!(widget.position(), anchored);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_draft_clears_draft_and_typing() {
        let widget = controller();
        widget.set_input("Alice");
        assert!(widget.typing().user_typing);

        let id = widget.send_draft().unwrap();
        assert_eq!(widget.state().draft, "");
        assert!(!widget.typing().user_typing);
        assert_eq!(widget.transcript().get(id).unwrap().text, "Alice");
        assert_eq!(widget.state().profile.user_name, "Alice");
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_send_is_ignored() {
        let widget = controller();
        assert_eq!(widget.send("   "), None);
        widget.set_input("  ");
        assert_eq!(widget.send_draft(), None);
        assert!(widget.transcript().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_message_snapshots_avatar() {
        let widget = controller();
        widget.set_avatar(Avatar::Panda);
        let id = widget.send("hi").unwrap();
        widget.set_avatar(Avatar::Robot);
        assert_eq!(
            widget.transcript().get(id).unwrap().avatar,
            Some(Avatar::Panda)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_error_becomes_notice() {
        let widget = controller();
        widget
            .select_file(SelectedFile::new(
                "a.pdf",
                "application/pdf",
                b"%PDF".to_vec(),
            ))
            .unwrap();

        let err = widget.summarize_attachment().await.unwrap_err();
        assert!(matches!(err, WidgetError::Network { .. }));
        let notice = widget.state().notice.unwrap();
        assert_eq!(notice, Notice::error("Error summarizing the file: offline"));
        assert!(widget.transcript().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_json_is_camel_case() {
        let widget = controller();
        widget.open();
        widget.send("Alice");
        let json: serde_json::Value = serde_json::from_str(&widget.snapshot_json().unwrap()).unwrap();
        assert_eq!(json["state"]["open"], true);
        assert_eq!(json["state"]["profile"]["userName"], "Alice");
        assert_eq!(json["typing"]["botTyping"], true);
        assert_eq!(json["messages"][0]["text"], "Alice");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_config_changes_reply_delay() {
        let widget = controller();
        widget.reload_config(WidgetConfig {
            reply_delay_ms: 100,
            ..WidgetConfig::default()
        });
        widget.send("Alice");
        tokio::time::sleep(Duration::from_millis(101)).await;
        tokio::task::yield_now().await;
        assert_eq!(widget.transcript().len(), 2);
    }
}
