//! Decoder implementations

use super::types::Envelope;
use crate::error::{Error, Result};
use crate::types::JsonValue;

/// Decode a response body into an [`Envelope`]
///
/// An empty body decodes to an empty envelope (some endpoints answer a
/// successful request with no content).
pub fn decode_envelope(body: &[u8]) -> Result<Envelope> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Envelope::default());
    }
    serde_json::from_slice(body).map_err(|e| Error::decode(e.to_string()))
}

/// Decode a response body into a raw JSON value
pub fn decode_json(body: &[u8]) -> Result<JsonValue> {
    serde_json::from_slice(body).map_err(|e| Error::decode(e.to_string()))
}
