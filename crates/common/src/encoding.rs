//! Base64 helpers
//!
//! The remote API carries binary columns as standard (padded) base64 text and
//! authenticates with an HTTP Basic header, so both directions live here.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Encode raw bytes as standard padded base64.
pub fn encode_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode standard base64 text, returning `None` for malformed input.
pub fn decode_base64(text: &str) -> Option<Vec<u8>> {
    BASE64.decode(text.trim()).ok()
}

/// Build the value of an `Authorization` header for Basic authentication.
pub fn basic_auth_header(username: &str, password: &str) -> String {
    format!("Basic {}", encode_base64(format!("{username}:{password}").as_bytes()))
}
