//! Image files to `data:` URIs for image mode and the CLI handoff slot.

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use std::fs;
use std::path::Path;

/// MIME type from the file extension, `None` for anything that is not an image
pub fn image_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, general_purpose::STANDARD.encode(bytes))
}

/// Read an image file into a data URI
pub fn image_data_uri(path: &Path) -> Result<String> {
    let Some(mime) = image_mime(path) else {
        bail!("Please select an image file.");
    };
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    tracing::debug!("Encoded {} ({} bytes) as {}", path.display(), bytes.len(), mime);
    Ok(encode_data_uri(mime, &bytes))
}
