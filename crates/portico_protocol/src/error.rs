//! Protocol errors.

use thiserror::Error;

use crate::schema::ParamType;

/// Errors raised while decoding, validating or encoding protocol messages.
///
/// A protocol error rejects one message; the connection stays open.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame is not a well-formed envelope.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// A positional parameter does not match the method schema.
    ///
    /// `expected` is `None` for a surplus parameter.
    #[error(
        "Schema mismatch in '{method}' at parameter {index}: expected {}, found {found}",
        expected.map_or_else(|| String::from("no parameter"), |t| t.to_string())
    )]
    SchemaMismatch {
        /// Method being validated.
        method: String,
        /// Zero-based parameter position.
        index: usize,
        /// Declared type at that position.
        expected: Option<ParamType>,
        /// JSON type actually present, or `"missing"`.
        found: &'static str,
    },

    /// No handler exists for the method.
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    /// JSON serialization failed.
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Creates a [`MalformedEnvelope`](Self::MalformedEnvelope).
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedEnvelope(msg.into())
    }

    /// Stable identifier used in JSON error envelopes.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedEnvelope(_) => "MalformedEnvelope",
            Self::SchemaMismatch { .. } => "SchemaMismatch",
            Self::UnknownMethod(_) => "UnknownMethod",
            Self::Encode(_) => "EncodeFailed",
        }
    }
}
