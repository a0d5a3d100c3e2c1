//! Parse-error taxonomy for inbound lines. Neither variant is fatal to a
//! session: callers drop the offending line and keep reading.

use thiserror::Error;

/// Failure to interpret one received line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The leading marker matches no known message kind.
    #[error("unknown message marker: {0:?}")]
    UnknownMessage(String),

    /// The marker is known but the line carries too few fields.
    #[error("malformed {kind} message: expected at least {expected} fields, got {got}")]
    MalformedMessage {
        kind: &'static str,
        expected: usize,
        got: usize,
    },

    /// A field was present but undecodable for its declared type.
    #[error("bad field in {kind} message: {source}")]
    BadField {
        kind: &'static str,
        #[source]
        source: FieldError,
    },
}

/// Failure to decode a single scalar token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("invalid numeric token {0:?}")]
    InvalidNumber(String),

    #[error("frequency below the 100 MHz band floor: {0} kHz")]
    FrequencyOutOfBand(u32),

    #[error("unknown {what} value {value:?}")]
    UnknownValue { what: &'static str, value: String },
}
