use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::WidgetError;

pub const ALLOWED_MIME_TYPES: &[&str] = &["application/pdf", "image/jpeg", "image/png"];

/// A file handed over by the host's file picker.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Reject anything but PDF/JPEG/PNG, or larger than `max_bytes`.
pub fn validate_file(file: &SelectedFile, max_bytes: u64) -> Result<(), WidgetError> {
    let mime = file.mime_type.trim().to_ascii_lowercase();
    if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
        return Err(WidgetError::validation(
            "Only PDF, JPEG, or PNG files are allowed",
        ));
    }
    if file.size_bytes() > max_bytes {
        return Err(WidgetError::validation(format!(
            "File size must be less than {}",
            format_size(max_bytes)
        )));
    }
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PreviewKind {
    #[default]
    None,
    #[serde(rename_all = "camelCase")]
    ImageDataUri { data_uri: String },
}

impl PreviewKind {
    pub fn data_uri(&self) -> Option<&str> {
        match self {
            PreviewKind::None => None,
            PreviewKind::ImageDataUri { data_uri } => Some(data_uri),
        }
    }
}

/// The pending attachment. Cloning shares the payload.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub id: Uuid,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub bytes: Arc<[u8]>,
    pub preview: PreviewKind,
}

impl Attachment {
    pub(crate) fn from_selected(file: SelectedFile) -> Self {
        let size_bytes = file.size_bytes();
        Self {
            id: Uuid::new_v4(),
            name: file.name,
            mime_type: file.mime_type.trim().to_ascii_lowercase(),
            size_bytes,
            bytes: Arc::from(file.bytes),
            preview: PreviewKind::None,
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn to_ref(&self) -> AttachmentRef {
        AttachmentRef {
            id: self.id,
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            size_bytes: self.size_bytes,
            preview: self.preview.clone(),
        }
    }
}

/// Payload-free view of an attachment, as carried by a transcript message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRef {
    pub id: Uuid,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub preview: PreviewKind,
}

/// Observable state of the attachment side panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentView {
    pub pending: Option<AttachmentRef>,
    pub preview_pending: bool,
    pub uploading: bool,
    pub summarizing: bool,
    pub recipient_email: String,
}
