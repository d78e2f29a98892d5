use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

use chatwidget_lib::services::attachment::Attachment;
use chatwidget_lib::{
    AttachmentBackend, MessageStatus, Notice, SelectedFile, Sender, WidgetConfig,
    WidgetController, WidgetError,
};

/// Backend whose calls block until the test releases them.
#[derive(Default)]
struct GatedBackend {
    release: Notify,
    started: AtomicUsize,
}

impl GatedBackend {
    async fn wait(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
    }

    async fn wait_started(&self, count: usize) {
        while self.started.load(Ordering::SeqCst) < count {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl AttachmentBackend for GatedBackend {
    async fn send_email(&self, attachment: &Attachment, email: &str) -> Result<String, WidgetError> {
        self.wait().await;
        Ok(format!("{} sent to {}", attachment.name, email))
    }

    async fn summarize(&self, attachment: &Attachment) -> Result<String, WidgetError> {
        self.wait().await;
        Ok(format!("{} in brief", attachment.name))
    }
}

/// Backend answering immediately.
struct InstantBackend;

#[async_trait]
impl AttachmentBackend for InstantBackend {
    async fn send_email(&self, attachment: &Attachment, email: &str) -> Result<String, WidgetError> {
        Ok(format!("{} sent to {}", attachment.name, email))
    }

    async fn summarize(&self, _attachment: &Attachment) -> Result<String, WidgetError> {
        Ok("a short report".to_string())
    }
}

fn widget() -> WidgetController {
    WidgetController::with_backend(WidgetConfig::default(), Arc::new(InstantBackend))
}

fn pdf(name: &str) -> SelectedFile {
    SelectedFile::new(name, "application/pdf", b"%PDF-1.4".to_vec())
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    tokio::task::yield_now().await;
}

#[tokio::test(start_paused = true)]
async fn test_first_message_is_name_then_echo() {
    let widget = widget();
    widget.open();

    let first = widget.send("Alice").unwrap();
    assert_eq!(widget.transcript().status_of(first), Some(MessageStatus::Sent));
    assert!(widget.typing().bot_typing);

    advance(1001).await;
    assert_eq!(
        widget.transcript().status_of(first),
        Some(MessageStatus::Delivered)
    );

    advance(200).await;
    let messages = widget.transcript().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].sender, Sender::Bot);
    assert_eq!(
        messages[1].text,
        "Nice to meet you, Alice! How can I help you today?"
    );
    assert_eq!(messages[0].status, Some(MessageStatus::Read));
    assert!(!widget.typing().bot_typing);
    assert_eq!(widget.state().profile.user_name, "Alice");

    widget.send("hello").unwrap();
    advance(1201).await;
    let last = widget.transcript().latest().unwrap();
    assert_eq!(last.text, "You said: hello");
    assert_eq!(widget.transcript().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_sends_each_get_a_reply() {
    let widget = widget();
    widget.send("Alice").unwrap();
    advance(500).await;
    widget.send("second").unwrap();

    advance(701).await;
    assert_eq!(widget.transcript().len(), 3);
    assert!(widget.typing().bot_typing);

    advance(500).await;
    let texts: Vec<String> = widget
        .transcript()
        .messages()
        .into_iter()
        .map(|m| m.text)
        .collect();
    assert_eq!(
        texts,
        vec![
            "Alice",
            "second",
            "Nice to meet you, Alice! How can I help you today?",
            "You said: second",
        ]
    );
    assert!(!widget.typing().bot_typing);
}

#[tokio::test(start_paused = true)]
async fn test_close_keeps_timers_running() {
    let widget = widget();
    widget.open();
    let anchored = widget.position();
    widget.pointer_down(anchored.x, anchored.y);
    widget.pointer_move(anchored.x - 100.0, anchored.y - 50.0);
    widget.pointer_up();

    widget.send("Alice").unwrap();
    widget.close();
    assert_eq!(widget.position(), anchored);

    advance(1201).await;
    assert_eq!(widget.transcript().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unmount_cancels_pending_work() {
    let widget = widget();
    let id = widget.send("Alice").unwrap();
    widget.set_input("typing...");
    assert!(widget.typing().user_typing);

    widget.unmount();
    advance(5000).await;

    assert_eq!(widget.transcript().len(), 1);
    assert_eq!(widget.transcript().status_of(id), Some(MessageStatus::Sent));
    assert_eq!(widget.send("anyone there?"), None);
}

#[tokio::test(start_paused = true)]
async fn test_user_typing_clears_after_quiet_period() {
    let widget = widget();
    widget.set_input("h");
    advance(1000).await;
    widget.set_input("he");
    advance(1000).await;
    assert!(widget.typing().user_typing);
    advance(501).await;
    assert!(!widget.typing().user_typing);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_file_becomes_error_notice() {
    let widget = widget();

    let err = widget
        .select_file(SelectedFile::new("notes.txt", "text/plain", b"hi".to_vec()))
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(
        widget.state().notice,
        Some(Notice::error("Only PDF, JPEG, or PNG files are allowed"))
    );

    let oversized = SelectedFile::new("big.pdf", "application/pdf", vec![0; 5 * 1024 * 1024 + 1]);
    widget.select_file(oversized).unwrap_err();
    assert_eq!(
        widget.state().notice,
        Some(Notice::error("File size must be less than 5MB"))
    );
    assert!(widget.attachment().pending.is_none());

    widget.select_file(pdf("ok.pdf")).unwrap();
    assert_eq!(widget.state().notice, None);
    assert_eq!(widget.attachment().pending.unwrap().name, "ok.pdf");
}

#[tokio::test(start_paused = true)]
async fn test_commit_and_summarize() {
    let widget = widget();
    widget.select_file(pdf("report.pdf")).unwrap();

    let summary = widget.summarize_attachment().await.unwrap().unwrap();
    assert_eq!(
        widget.transcript().get(summary).unwrap().text,
        "Summary: a short report"
    );
    assert!(widget.attachment().pending.is_some());

    let uploaded = widget.commit_attachment().unwrap();
    let message = widget.transcript().get(uploaded).unwrap();
    assert_eq!(message.text, "Uploaded file: report.pdf");
    assert_eq!(message.attachment.unwrap().name, "report.pdf");
    assert!(widget.attachment().pending.is_none());

    let err = widget.commit_attachment().unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_stale_summary_is_discarded() {
    let backend = Arc::new(GatedBackend::default());
    let widget = Arc::new(WidgetController::with_backend(
        WidgetConfig::default(),
        backend.clone(),
    ));
    widget.select_file(pdf("first.pdf")).unwrap();

    let task = tokio::spawn({
        let widget = widget.clone();
        async move { widget.summarize_attachment().await }
    });
    backend.wait_started(1).await;
    assert!(widget.attachment().summarizing);

    widget.select_file(pdf("second.pdf")).unwrap();
    assert!(!widget.attachment().summarizing);
    backend.release.notify_one();

    assert_eq!(task.await.unwrap(), Ok(None));
    assert!(widget.transcript().is_empty());
    assert_eq!(widget.attachment().pending.unwrap().name, "second.pdf");
}

#[tokio::test]
async fn test_send_email_flow() {
    let backend = Arc::new(GatedBackend::default());
    let widget = Arc::new(WidgetController::with_backend(
        WidgetConfig::default(),
        backend.clone(),
    ));

    let err = widget.send_attachment_email().await.unwrap_err();
    assert_eq!(err.message(), "Please provide a valid email and file");

    widget.select_file(pdf("invoice.pdf")).unwrap();
    widget.set_recipient_email("bob@example.com");

    let task = tokio::spawn({
        let widget = widget.clone();
        async move { widget.send_attachment_email().await }
    });
    backend.wait_started(1).await;
    assert!(widget.attachment().uploading);
    backend.release.notify_one();

    let confirmation = task.await.unwrap().unwrap().unwrap();
    assert_eq!(confirmation, "invoice.pdf sent to bob@example.com");
    assert_eq!(widget.state().notice, Some(Notice::info(confirmation)));
    let view = widget.attachment();
    assert!(!view.uploading);
    assert_eq!(view.recipient_email, "");
    assert!(view.pending.is_some());
}

#[tokio::test]
async fn test_image_selection_gets_preview() {
    let image = image::RgbImage::from_pixel(4, 4, image::Rgb([0, 120, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();

    let widget = widget();
    let mut rx = widget.subscribe_attachment();
    widget
        .select_file(SelectedFile::new("dot.png", "image/png", bytes))
        .unwrap();

    let view = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let view = rx.borrow_and_update().clone();
            if !view.preview_pending {
                break view;
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .unwrap();

    let pending = view.pending.unwrap();
    assert!(
        pending
            .preview
            .data_uri()
            .unwrap()
            .starts_with("data:image/png;base64,")
    );
}

#[tokio::test]
async fn test_commit_while_summarizing_keeps_summary() {
    let backend = Arc::new(GatedBackend::default());
    let widget = Arc::new(WidgetController::with_backend(
        WidgetConfig::default(),
        backend.clone(),
    ));
    widget.select_file(pdf("r.pdf")).unwrap();

    let task = tokio::spawn({
        let widget = widget.clone();
        async move { widget.summarize_attachment().await }
    });
    backend.wait_started(1).await;
    widget.commit_attachment().unwrap();
    backend.release.notify_one();

    assert!(task.await.unwrap().unwrap().is_some());
    let texts: Vec<String> = widget
        .transcript()
        .messages()
        .into_iter()
        .map(|m| m.text)
        .collect();
    assert_eq!(texts, vec!["Uploaded file: r.pdf", "Summary: r.pdf in brief"]);
}

#[tokio::test]
async fn test_send_email_for_replaced_file_is_discarded() {
    let backend = Arc::new(GatedBackend::default());
    let widget = Arc::new(WidgetController::with_backend(
        WidgetConfig::default(),
        backend.clone(),
    ));
    widget.select_file(pdf("old.pdf")).unwrap();
    widget.set_recipient_email("bob@example.com");

    let task = tokio::spawn({
        let widget = widget.clone();
        async move { widget.send_attachment_email().await }
    });
    backend.wait_started(1).await;
    widget.select_file(pdf("new.pdf")).unwrap();
    backend.release.notify_one();

    assert_eq!(task.await.unwrap(), Ok(None));
    assert_eq!(widget.state().notice, None);
    let view = widget.attachment();
    assert!(!view.uploading);
    assert_eq!(view.recipient_email, "bob@example.com");
    assert_eq!(view.pending.unwrap().name, "new.pdf");
}
