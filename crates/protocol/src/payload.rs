//! Binary payload handling.
//!
//! CDP returns binary data (screenshots, downloads) as standard base64
//! strings inside JSON results.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Decodes a base64 payload field (e.g. `Page.captureScreenshot` `data`).
pub fn decode_base64_payload(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(data)
}
