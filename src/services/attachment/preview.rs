use base64::{Engine as _, engine::general_purpose};
use std::sync::Arc;

use super::types::PreviewKind;

pub(crate) fn to_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(bytes)
    )
}

/// Header probe: a payload that does not even parse as an image gets no preview.
#[cfg(feature = "preview")]
fn has_image_header(mime_type: &str, bytes: &[u8]) -> bool {
    let probed = image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| format!("Failed to read image: {}", e))
        .and_then(|reader| {
            reader
                .into_dimensions()
                .map_err(|e| format!("Failed to decode image header: {}", e))
        });

    match probed {
        Ok((width, height)) => {
            log::debug!("preview source {}x{} ({})", width, height, mime_type);
            true
        }
        Err(err) => {
            log::warn!("No preview for {} attachment: {}", mime_type, err);
            false
        }
    }
}

#[cfg(not(feature = "preview"))]
fn has_image_header(_mime_type: &str, _bytes: &[u8]) -> bool {
    true
}

pub(crate) fn render_preview(mime_type: &str, bytes: &[u8]) -> PreviewKind {
    if !has_image_header(mime_type, bytes) {
        return PreviewKind::None;
    }
    PreviewKind::ImageDataUri {
        data_uri: to_data_uri(mime_type, bytes),
    }
}

/// Build the preview off the async executor.
pub(crate) async fn decode_preview(mime_type: String, bytes: Arc<[u8]>) -> PreviewKind {
    tokio::task::spawn_blocking(move || render_preview(&mime_type, &bytes))
        .await
        .unwrap_or_else(|err| {
            log::warn!("Preview task failed: {}", err);
            PreviewKind::None
        })
}
