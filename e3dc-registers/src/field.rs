//! Field descriptors and decoded field values

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::RegisterDecoder;
use crate::error::DecodeError;

/// A decoded register field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
}

impl FieldValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(value) => Some(*value),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value),
            FieldValue::Integer(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(value) => write!(f, "{}", value),
            FieldValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<u16> for FieldValue {
    fn from(value: u16) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// How the words of a field are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeKind {
    UInt16,
    Int16,
    UInt32,
    Int32,
    /// NUL-padded UTF-8 string spanning the given number of words
    FixedString(u16),
}

impl DecodeKind {
    /// Number of registers a field of this kind occupies
    pub const fn word_count(&self) -> u16 {
        match self {
            DecodeKind::UInt16 | DecodeKind::Int16 => 1,
            DecodeKind::UInt32 | DecodeKind::Int32 => 2,
            DecodeKind::FixedString(words) => *words,
        }
    }
}

/// Static description of one field of a register block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Display name shown to users
    pub name: &'static str,
    /// Key under which the decoded value is cached
    pub key: &'static str,
    /// First holding register of the field
    pub address: u16,
    pub kind: DecodeKind,
    /// Material Design icon used by hosts that display the field
    pub icon: &'static str,
}

impl FieldDescriptor {
    pub const fn new(
        name: &'static str,
        key: &'static str,
        address: u16,
        kind: DecodeKind,
        icon: &'static str,
    ) -> Self {
        Self {
            name,
            key,
            address,
            kind,
            icon,
        }
    }

    /// Number of registers to read for this field
    pub const fn count(&self) -> u16 {
        self.kind.word_count()
    }

    /// Decode the words returned by reading [`count`](Self::count) registers at [`address`](Self::address)
    pub fn decode(&self, words: &[u16]) -> Result<FieldValue, DecodeError> {
        let mut decoder = RegisterDecoder::new(words);
        let value = match self.kind {
            DecodeKind::UInt16 => FieldValue::Integer(i64::from(decoder.decode_u16())),
            DecodeKind::Int16 => FieldValue::Integer(i64::from(decoder.decode_i16())),
            DecodeKind::UInt32 => FieldValue::Integer(i64::from(decoder.decode_u32())),
            DecodeKind::Int32 => FieldValue::Integer(i64::from(decoder.decode_i32())),
            DecodeKind::FixedString(words) => {
                FieldValue::Text(decoder.decode_fixed_string(usize::from(words))?)
            }
        };
        Ok(value)
    }
}
