// file: src/remote/encoding.rs
// description: base64 transport encoding for file bodies
// reference: https://docs.rs/base64

use crate::error::{BackupError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

pub fn encode_text(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decodes a base64 body into UTF-8 text. Embedded whitespace is ignored
/// since the contents API wraps its output at 60 columns.
pub fn decode_text(body: &str) -> Result<String> {
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| BackupError::Decode(format!("invalid base64: {}", e)))?;

    String::from_utf8(bytes)
        .map_err(|e| BackupError::Decode(format!("content is not UTF-8 text: {}", e)))
}
