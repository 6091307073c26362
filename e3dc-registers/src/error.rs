use std::str::Utf8Error;

use thiserror::Error;

/// Errors raised while turning register words into typed values
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    /// The bytes before the first NUL are not valid UTF-8
    #[error("Invalid UTF-8 in string register block: {0}")]
    InvalidUtf8(#[from] Utf8Error),
}

/// Errors raised while packing typed values into register words
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The string does not fit into the register block
    #[error("String of {len} bytes does not fit into {capacity} bytes")]
    StringTooLong { len: usize, capacity: usize },

    /// NUL terminates a string block, so it cannot appear inside the value
    #[error("String contains an interior NUL byte")]
    InteriorNul,
}

/// Type alias for decode results
pub type Result<T> = std::result::Result<T, DecodeError>;
