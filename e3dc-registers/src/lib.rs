//! # E3DC Registers
//!
//! Type-safe description of the holding registers exposed by an E3DC
//! Hauskraftwerk, plus the word codec used to decode them.
//!
//! ## Overview
//!
//! - [`RegisterDecoder`] / [`RegisterEncoder`]: cursor-based conversion between
//!   big-endian register words and integers or NUL-padded strings
//! - [`FieldDescriptor`]: where a field lives and how it is decoded
//! - [`RegisterBlock`]: an ordered list of fields read together
//! - [`IDENTIFICATION_BLOCK`]: manufacturer, model, serial number and firmware
//!
//! ## Usage
//!
//! ```rust
//! use e3dc_registers::{FieldValue, IDENTIFICATION_BLOCK};
//!
//! let model = IDENTIFICATION_BLOCK.field("model").unwrap();
//! assert_eq!(model.address, 40019);
//!
//! // Words as returned by reading `model.count()` registers
//! let mut words = vec![0u16; usize::from(model.count())];
//! words[0] = 0x5331; // "S1"
//! words[1] = 0x3000; // "0\0"
//! assert_eq!(model.decode(&words).unwrap(), FieldValue::Text("S10".into()));
//! ```

pub mod blocks;
pub mod codec;
pub mod error;
pub mod field;

pub use blocks::{keys, RegisterBlock, DEFAULT_BLOCKS, IDENTIFICATION_BLOCK};
pub use codec::{RegisterDecoder, RegisterEncoder};
pub use error::{DecodeError, EncodeError, Result};
pub use field::{DecodeKind, FieldDescriptor, FieldValue};
