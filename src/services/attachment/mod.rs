//! The single pending-attachment slot: validation, preview, and the
//! send-email/summarize side actions.

mod backend;
mod pipeline;
mod preview;
mod types;

pub use backend::{
    AttachmentBackend, HttpBackend, SEND_EMAIL_FALLBACK_ERROR, SUMMARIZE_FALLBACK_ERROR,
};
pub use pipeline::AttachmentPipeline;
pub use types::{
    ALLOWED_MIME_TYPES, Attachment, AttachmentRef, AttachmentView, PreviewKind, SelectedFile,
    validate_file,
};
