//! Error types for CompactMap.

use crate::codec::Kind;
use std::io;
use thiserror::Error;

/// The result type used throughout CompactMap.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for CompactMap operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error occurred while saving or loading a file.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The decoder ran out of input before a value was complete.
    #[error("data too short: need {needed} bytes, have {available}")]
    DataTooShort {
        /// Bytes required to decode the value.
        needed: usize,
        /// Bytes left in the input.
        available: usize,
    },

    /// The codec cannot encode or decode values of this kind.
    #[error("unsupported type: {0}")]
    UnsupportedType(Kind),

    /// A query combination other than "", "AND" or "OR".
    #[error("invalid condition: {0:?}")]
    InvalidCondition(String),

    /// A comparison operator name that is not recognised.
    #[error("invalid operator: {0:?}")]
    InvalidOperator(String),

    /// A value could not be converted to the declared type of a field.
    #[error("value of type {found} is not assignable to field {field} of type {expected}")]
    TypeMismatch {
        /// Field name as requested by the caller.
        field: String,
        /// Declared kind of the field.
        expected: Kind,
        /// Kind of the supplied value.
        found: Kind,
    },

    /// Decoded bytes do not form a valid value.
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// An invalid argument was provided.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Creates a new data-too-short error.
    pub fn too_short(needed: usize, available: usize) -> Self {
        Error::DataTooShort { needed, available }
    }

    /// Creates a new corruption error.
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidArgument(err.to_string())
    }
}
