//! Hex/JSON codec.
//!
//! Rollup inputs and reports carry UTF-8 JSON as 0x-prefixed hex.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{bytes_to_hex, hex_to_bytes, CartesifyError, Hex, Result};

/// Serialize `value` to JSON and hex-encode its UTF-8 bytes.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<Hex> {
    Ok(bytes_to_hex(&to_json_bytes(value)?))
}

/// Serialize `value` to UTF-8 JSON bytes, the form submitted as input data.
pub fn to_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| CartesifyError::InvalidJson(e.to_string()))
}

/// Hex-decode a payload and parse it as JSON.
pub fn decode_json<T: DeserializeOwned>(hex_str: &str) -> Result<T> {
    let bytes = hex_to_bytes(hex_str)?;
    let text = String::from_utf8(bytes).map_err(|e| CartesifyError::InvalidJson(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| CartesifyError::InvalidJson(e.to_string()))
}
