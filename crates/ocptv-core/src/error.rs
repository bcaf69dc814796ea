use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::typecheck::CheckError;

/// Coarse classification of output failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The record model itself is malformed. Programmer error.
    Configuration,
    /// A value cannot be emitted as given.
    Data,
    /// The sink failed.
    Io,
}

impl ErrorKind {
    /// Lowercase name used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Data => "data",
            Self::Io => "io",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures raised while turning a record graph into JSON.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("bad record declaration: field '{record}.{field}' has neither a wire name nor an object name")]
    MissingWireName {
        record: &'static str,
        field: &'static str,
    },

    #[error("required field '{record}.{field}' has no value")]
    MissingRequiredField {
        record: &'static str,
        field: &'static str,
    },

    #[error("don't know how to serialize value of type '{type_name}'")]
    Unserializable { type_name: &'static str },

    #[error("mapping keys must be strings, found '{type_name}'")]
    NonStringKey { type_name: &'static str },

    #[error("number {value} cannot be represented in JSON")]
    NonFiniteNumber { value: f64 },

    #[error("timestamp {value} is out of range")]
    InvalidTimestamp { value: f64 },

    #[error("formatter for '{field}' expected {expected}, found '{found}'")]
    FormatterInput {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error(transparent)]
    TypeCheck(#[from] CheckError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SerializeError {
    /// Configuration or data error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingWireName { .. } | Self::FormatterInput { .. } => {
                ErrorKind::Configuration
            }
            Self::TypeCheck(error) => error.kind(),
            Self::MissingRequiredField { .. }
            | Self::Unserializable { .. }
            | Self::NonStringKey { .. }
            | Self::NonFiniteNumber { .. }
            | Self::InvalidTimestamp { .. }
            | Self::Json(_) => ErrorKind::Data,
        }
    }
}
