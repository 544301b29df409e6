//! Error types for the live connection.

use thiserror::Error;

/// Errors raised by the live transport.
///
/// None of these reach callers of the session: the link turns them into
/// advisories and reconnects.
#[derive(Debug, Error)]
pub enum LiveError {
    /// The connection could not be established.
    #[error("Connection to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    /// The connection attempt did not finish in time.
    #[error("Connection to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// Sending a frame failed.
    #[error("Send failed: {0}")]
    Send(String),

    /// Receiving a frame failed.
    #[error("Receive failed: {0}")]
    Receive(String),

    /// The connection is not open.
    #[error("Connection closed")]
    Closed,

    /// A frame could not be serialized.
    #[error("Failed to serialize frame: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised while decoding an inbound payload.
///
/// Decoding is lenient at the edge: these are logged, and a best-effort
/// record is produced instead.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame was not valid JSON or lacked a `type`.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// The payload matched neither the internal nor the external vehicle shape.
    #[error("Unrecognized vehicle payload: {0}")]
    UnrecognizedShape(String),

    /// A field had an unusable value.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}
