//! Register blocks supported by the hub
//!
//! A block is a fixed list of fields read in declared order during one
//! refresh cycle.

use crate::field::{DecodeKind, FieldDescriptor};

/// Cache keys of the identification block
pub mod keys {
    pub const MODBUS_FIRMWARE: &str = "modbusfirmware";
    pub const REGISTER_COUNT: &str = "registercount";
    pub const MANUFACTURER: &str = "manufacturer";
    pub const MODEL: &str = "model";
    pub const SERIAL_NUMBER: &str = "serialnumber";
    pub const FIRMWARE: &str = "firmware";
}

/// A named, ordered group of fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterBlock {
    pub name: &'static str,
    pub fields: &'static [FieldDescriptor],
}

impl RegisterBlock {
    /// Look up a field by cache key
    pub fn field(&self, key: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|field| field.key == key)
    }

    /// Total number of registers read by one pass over the block
    pub fn register_count(&self) -> u32 {
        self.fields.iter().map(|field| u32::from(field.count())).sum()
    }
}

/// Static identity of the device
pub const IDENTIFICATION_BLOCK: RegisterBlock = RegisterBlock {
    name: "identification",
    fields: &[
        FieldDescriptor::new(
            "Modbus-Firmwareversion",
            keys::MODBUS_FIRMWARE,
            40001,
            DecodeKind::UInt16,
            "mdi:eye",
        ),
        FieldDescriptor::new(
            "Anzahl unterstützter Register",
            keys::REGISTER_COUNT,
            40002,
            DecodeKind::UInt16,
            "mdi:eye",
        ),
        FieldDescriptor::new(
            "Hersteller",
            keys::MANUFACTURER,
            40003,
            DecodeKind::FixedString(16),
            "mdi:factory",
        ),
        FieldDescriptor::new(
            "Model",
            keys::MODEL,
            40019,
            DecodeKind::FixedString(16),
            "mdi:eye",
        ),
        FieldDescriptor::new(
            "Seriennummer",
            keys::SERIAL_NUMBER,
            40035,
            DecodeKind::FixedString(16),
            "mdi:eye",
        ),
        FieldDescriptor::new(
            "Firmware",
            keys::FIRMWARE,
            40051,
            DecodeKind::FixedString(16),
            "mdi:eye",
        ),
    ],
};

/// Blocks read by default on every poll
pub const DEFAULT_BLOCKS: &[&RegisterBlock] = &[&IDENTIFICATION_BLOCK];
