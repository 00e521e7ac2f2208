//! Image inlining for multimodal prompts.

use crate::transport::TransportError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;

/// MIME type declared for every inlined image, whatever its actual format.
pub const IMAGE_MIME_TYPE: &str = "image/jpeg";

/// Reads an image file and returns it as a `data:image/jpeg;base64,...` URI.
///
/// # Errors
///
/// Returns [`TransportError::Io`] if the file cannot be read.
pub fn encode_image_data_uri(path: &Path) -> Result<String, TransportError> {
    let bytes = std::fs::read(path).map_err(|source| TransportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(format!(
        "data:{IMAGE_MIME_TYPE};base64,{}",
        STANDARD.encode(bytes)
    ))
}
