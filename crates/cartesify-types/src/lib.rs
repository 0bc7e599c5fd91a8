//! Shared types for the Cartesify SDK.
//!
//! - Error taxonomy and `Result` alias
//! - Hex/JSON codec for rollup inputs and reports
//! - Wire envelopes exchanged with the dapp backend

use thiserror::Error;

pub mod codec;
pub mod envelope;

pub use envelope::{
    FetchRequest, Headers, InboundResult, InputAddedEvent, OutboundEnvelope, RemoteError,
    SuccessPayload,
};

/// 0x-prefixed hex string (e.g. "0x1234...").
pub type Hex = String;

/// Cartesify SDK error types.
#[derive(Debug, Error)]
pub enum CartesifyError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid json payload: {0}")]
    InvalidJson(String),

    /// Provider, RPC node or HTTP endpoint could not be reached.
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// Signer or account problem reported by the node.
    #[error("signer error: {0}")]
    Auth(String),

    /// Transaction reverted or was rejected by the contract.
    #[error("contract error: {0}")]
    Contract(String),

    /// Response did not have the expected shape.
    #[error("malformed response: {0}")]
    Protocol(String),

    #[error("no report for input {input_index} after {attempts} attempts")]
    ReportTimeout { input_index: u64, attempts: u32 },

    #[error("request {0} timed out")]
    RequestTimeout(String),

    /// Non-2xx answer where the caller asked for one to be an error.
    #[error("request failed with status code {status}")]
    Status { status: u16, body: String },

    #[error("request id already registered: {0}")]
    DuplicateRequest(String),

    /// Error reported by the dapp backend, reconstructed from the report.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CartesifyError>;

/// Parse a hex string (with or without 0x) to bytes.
pub fn hex_to_bytes(hex_str: &str) -> Result<Vec<u8>> {
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    hex::decode(hex_str).map_err(|e| CartesifyError::InvalidHex(e.to_string()))
}

/// Convert bytes to a 0x-prefixed hex string.
pub fn bytes_to_hex(bytes: &[u8]) -> Hex {
    format!("0x{}", hex::encode(bytes))
}
