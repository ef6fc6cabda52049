//! Protocol-layer errors

use thiserror::Error;

/// Errors that can occur while parsing or constructing wire envelopes
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The envelope was not valid JSON
    #[error("invalid envelope: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The envelope was valid JSON but missing the mandatory `type` field,
    /// or carried a `type` the router does not recognize
    #[error("unrecognized envelope type: {0}")]
    UnknownType(String),

    /// A required field was missing for the envelope's `type`
    #[error("missing field `{field}` on `{envelope_type}` envelope")]
    MissingField {
        envelope_type: &'static str,
        field: &'static str,
    },
}
