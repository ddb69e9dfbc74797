//! Image loading for upload analysis.
//!
//! Images are passed to the model as raw bytes. Nothing is decoded or resized here.

use crate::error::{DishVisionError, Result};
use std::path::Path;
use tracing::{debug, warn};

/// MIME label attached to every image payload.
pub const IMAGE_MIME_TYPE: &str = "image/jpeg";

/// Raw image bytes tagged with a MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImagePayload {
    pub fn jpeg(data: Vec<u8>) -> Self {
        Self {
            mime_type: IMAGE_MIME_TYPE.to_string(),
            data,
        }
    }
}

/// Read an image file into an [`ImagePayload`].
///
/// Fails with [`DishVisionError::ImageNotFound`] when `path` does not exist. The payload is
/// always labelled `image/jpeg`; other extensions only produce a warning.
pub fn read_image(path: impl AsRef<Path>) -> Result<ImagePayload> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(DishVisionError::ImageNotFound(path.to_path_buf()));
    }

    if !has_jpeg_extension(path) {
        warn!("Sending {:?} labelled as {} regardless of its actual format", path, IMAGE_MIME_TYPE);
    }

    let data = std::fs::read(path)?;
    debug!("Read {} bytes from {:?}", data.len(), path);

    Ok(ImagePayload::jpeg(data))
}

fn has_jpeg_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false)
}
