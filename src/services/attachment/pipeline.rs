use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::WidgetError;
use crate::services::transcript::{MessageId, MessageStore, NewMessage};

use super::backend::AttachmentBackend;
use super::preview::decode_preview;
use super::types::{Attachment, AttachmentView, PreviewKind, SelectedFile, validate_file};

const NO_FILE_SELECTED: &str = "No file selected";
const EMAIL_AND_FILE_REQUIRED: &str = "Please provide a valid email and file";

#[derive(Default)]
struct PendingSlot {
    pending: Option<Arc<Attachment>>,
    preview_task: Option<JoinHandle<()>>,
    uploading: bool,
    summarizing: bool,
    recipient_email: String,
    /// Bumped by `select`, `clear` and `shutdown`. Commit leaves it alone, so a
    /// summary or send-email started on a committed file still lands.
    superseded: u64,
    shut_down: bool,
}

impl PendingSlot {
    fn view(&self) -> AttachmentView {
        AttachmentView {
            pending: self.pending.as_ref().map(|a| a.to_ref()),
            preview_pending: self.preview_task.is_some(),
            uploading: self.uploading,
            summarizing: self.summarizing,
            recipient_email: self.recipient_email.clone(),
        }
    }

    /// Preview completions only apply while their file is still staged.
    fn is_current(&self, id: Uuid) -> bool {
        !self.shut_down && self.pending.as_ref().is_some_and(|a| a.id == id)
    }

    /// Whether a side action started at `epoch` has been overtaken.
    fn is_superseded(&self, epoch: u64) -> bool {
        self.shut_down || self.superseded != epoch
    }

    fn supersede(&mut self) {
        self.superseded = self.superseded.wrapping_add(1);
        self.cancel_preview();
        self.uploading = false;
        self.summarizing = false;
    }

    fn cancel_preview(&mut self) {
        if let Some(task) = self.preview_task.take() {
            task.abort();
        }
    }
}

struct PipelineInner {
    store: MessageStore,
    backend: Arc<dyn AttachmentBackend>,
    slot: Mutex<PendingSlot>,
    changed: watch::Sender<AttachmentView>,
}

/// Owner of the single pending-attachment slot.
///
/// Every async completion (preview decode, summarize, send-email) carries the
/// id of the attachment it started with and is dropped if the slot has moved on.
#[derive(Clone)]
pub struct AttachmentPipeline {
    inner: Arc<PipelineInner>,
}

impl AttachmentPipeline {
    pub fn new(store: MessageStore, backend: Arc<dyn AttachmentBackend>) -> Self {
        let (changed, _) = watch::channel(AttachmentView::default());
        Self {
            inner: Arc::new(PipelineInner {
                store,
                backend,
                slot: Mutex::new(PendingSlot::default()),
                changed,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PendingSlot> {
        self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, slot: &PendingSlot) {
        let view = slot.view();
        self.inner.changed.send_if_modified(|current| {
            if *current == view {
                return false;
            }
            *current = view;
            true
        });
    }

    /// Validate and stage `file`, replacing whatever was pending.
    ///
    /// A rejected file leaves the previous attachment untouched. Images get a
    /// data-URI preview attached asynchronously.
    pub fn select(&self, file: SelectedFile, max_bytes: u64) -> Result<Uuid, WidgetError> {
        if let Err(err) = validate_file(&file, max_bytes) {
            log::info!("Rejected attachment {:?}: {}", file.name, err.message());
            return Err(err);
        }

        let mut slot = self.lock();
        if slot.shut_down {
            return Err(WidgetError::internal("Widget is unmounted"));
        }

        let attachment = Attachment::from_selected(file);
        let id = attachment.id;
        // In-flight calls for the old file finish against a newer epoch.
        slot.supersede();

        if attachment.is_image() {
            let pipeline = self.clone();
            let mime_type = attachment.mime_type.clone();
            let bytes = attachment.bytes.clone();
            slot.preview_task = Some(tokio::spawn(async move {
                let preview = decode_preview(mime_type, bytes).await;
                pipeline.attach_preview(id, preview);
            }));
        }

        log::debug!(
            "Attachment {} staged: {} ({} bytes)",
            id,
            attachment.name,
            attachment.size_bytes
        );
        slot.pending = Some(Arc::new(attachment));
        self.publish(&slot);
        Ok(id)
    }

    /// Store a finished preview. Returns `false` for a superseded attachment.
    pub(crate) fn attach_preview(&self, id: Uuid, preview: PreviewKind) -> bool {
        let mut slot = self.lock();
        if !slot.is_current(id) {
            log::debug!("Discarding stale preview for attachment {}", id);
            return false;
        }
        slot.preview_task = None;
        if let Some(current) = slot.pending.as_ref() {
            let mut updated = Attachment::clone(current);
            updated.preview = preview;
            slot.pending = Some(Arc::new(updated));
        }
        self.publish(&slot);
        true
    }

    /// Drop the pending attachment without sending it anywhere.
    pub fn clear(&self) {
        let mut slot = self.lock();
        slot.supersede();
        slot.pending = None;
        self.publish(&slot);
    }

    pub fn pending(&self) -> Option<Arc<Attachment>> {
        self.lock().pending.clone()
    }

    pub fn view(&self) -> AttachmentView {
        self.lock().view()
    }

    pub fn subscribe(&self) -> watch::Receiver<AttachmentView> {
        self.inner.changed.subscribe()
    }

    pub fn set_recipient_email(&self, email: &str) {
        let mut slot = self.lock();
        slot.recipient_email = email.to_string();
        self.publish(&slot);
    }

    /// Insert the pending file into the transcript as a bot-narrated message
    /// and clear the slot.
    ///
    /// Carries whatever preview is ready at this point; a decode still in
    /// flight is abandoned.
    pub fn commit_as_message(&self) -> Result<MessageId, WidgetError> {
        let mut slot = self.lock();
        if slot.shut_down {
            return Err(WidgetError::internal("Widget is unmounted"));
        }
        let attachment = slot
            .pending
            .take()
            .ok_or_else(|| WidgetError::validation(NO_FILE_SELECTED))?;
        slot.cancel_preview();
        self.publish(&slot);
        drop(slot);

        let id = self.inner.store.append(
            NewMessage::bot(format!("Uploaded file: {}", attachment.name))
                .with_attachment(attachment.to_ref()),
        );
        Ok(id)
    }

    /// Send the pending file to the summarizer and narrate the result.
    ///
    /// Returns `Ok(None)` when the attachment was replaced or cleared (or the
    /// widget torn down) while the request was in flight; the result is then
    /// discarded. Committing the file meanwhile does not discard it. The
    /// pending attachment stays staged either way.
    pub async fn summarize(&self) -> Result<Option<MessageId>, WidgetError> {
        let (attachment, epoch) = {
            let mut slot = self.lock();
            let attachment = slot
                .pending
                .clone()
                .ok_or_else(|| WidgetError::validation(NO_FILE_SELECTED))?;
            if slot.summarizing {
                return Err(WidgetError::validation("A summary is already in progress"));
            }
            slot.summarizing = true;
            self.publish(&slot);
            (attachment, slot.superseded)
        };

        let result = self.inner.backend.summarize(&attachment).await;

        let mut slot = self.lock();
        if slot.is_superseded(epoch) {
            log::debug!("Discarding summary for replaced attachment {}", attachment.id);
            return Ok(None);
        }
        slot.summarizing = false;
        self.publish(&slot);

        match result {
            Ok(summary) => {
                // Appended under the slot lock so a teardown cannot slip in between.
                let id = self
                    .inner
                    .store
                    .append(NewMessage::bot(format!("Summary: {}", summary)));
                Ok(Some(id))
            }
            Err(err) => {
                log::warn!("Summarize failed for {}: {}", attachment.name, err);
                Err(err)
            }
        }
    }

    /// Mail the pending file to the stored recipient address.
    ///
    /// On success the recipient field is cleared and the server's confirmation
    /// is returned. Stale completions yield `Ok(None)`.
    pub async fn send_email(&self) -> Result<Option<String>, WidgetError> {
        let (attachment, email, epoch) = {
            let mut slot = self.lock();
            let email = slot.recipient_email.trim().to_string();
            let Some(attachment) = slot.pending.clone() else {
                return Err(WidgetError::validation(EMAIL_AND_FILE_REQUIRED));
            };
            if email.is_empty() {
                return Err(WidgetError::validation(EMAIL_AND_FILE_REQUIRED));
            }
            if slot.uploading {
                return Err(WidgetError::validation("File is already being sent"));
            }
            slot.uploading = true;
            self.publish(&slot);
            (attachment, email, slot.superseded)
        };

        let result = self.inner.backend.send_email(&attachment, &email).await;

        let mut slot = self.lock();
        if slot.is_superseded(epoch) {
            log::debug!("Discarding send-email result for replaced attachment {}", attachment.id);
            return Ok(None);
        }
        slot.uploading = false;
        if result.is_ok() {
            slot.recipient_email.clear();
        }
        self.publish(&slot);

        match result {
            Ok(message) => Ok(Some(message)),
            Err(err) => {
                log::warn!("Send-email failed for {}: {}", attachment.name, err);
                Err(err)
            }
        }
    }

    /// Abort the preview task and make every later completion a no-op.
    pub fn shutdown(&self) {
        let mut slot = self.lock();
        slot.shut_down = true;
        slot.supersede();
        self.publish(&slot);
    }
}
