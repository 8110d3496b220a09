use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::export::Language;

/// Underlying integer representation of an exported enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum StorageType {
    /// No explicit storage type; the target language picks its default (32-bit signed).
    #[default]
    Implicit,
    Signed8Bit,
    Unsigned8Bit,
    Signed16Bit,
    Unsigned16Bit,
    Signed32Bit,
    Unsigned32Bit,
    Signed64Bit,
    Unsigned64Bit,
}

pub const ALL_STORAGE_TYPES: [StorageType; 9] = [
    StorageType::Implicit,
    StorageType::Signed8Bit,
    StorageType::Unsigned8Bit,
    StorageType::Signed16Bit,
    StorageType::Unsigned16Bit,
    StorageType::Signed32Bit,
    StorageType::Unsigned32Bit,
    StorageType::Signed64Bit,
    StorageType::Unsigned64Bit,
];

impl StorageType {
    pub fn min_value(self) -> i64 {
        match self {
            StorageType::Implicit      => i32::MIN as i64,
            StorageType::Signed8Bit    => i8::MIN as i64,
            StorageType::Unsigned8Bit  => 0,
            StorageType::Signed16Bit   => i16::MIN as i64,
            StorageType::Unsigned16Bit => 0,
            StorageType::Signed32Bit   => i32::MIN as i64,
            StorageType::Unsigned32Bit => 0,
            StorageType::Signed64Bit   => i64::MIN,
            StorageType::Unsigned64Bit => 0,
        }
    }

    /// Values are held as `i64`, so `Unsigned64Bit` tops out at `i64::MAX`
    /// rather than `u64::MAX`.
    pub fn max_value(self) -> i64 {
        match self {
            StorageType::Implicit      => i32::MAX as i64,
            StorageType::Signed8Bit    => i8::MAX as i64,
            StorageType::Unsigned8Bit  => u8::MAX as i64,
            StorageType::Signed16Bit   => i16::MAX as i64,
            StorageType::Unsigned16Bit => u16::MAX as i64,
            StorageType::Signed32Bit   => i32::MAX as i64,
            StorageType::Unsigned32Bit => u32::MAX as i64,
            StorageType::Signed64Bit   => i64::MAX,
            StorageType::Unsigned64Bit => i64::MAX,
        }
    }

    /// Returns `true` if `value` can be represented with this storage type.
    pub fn validate(self, value: i64) -> bool {
        value >= self.min_value() && value <= self.max_value()
    }

    /// The language token naming this storage type: a type keyword for C#,
    /// Visual Basic and CIL, a literal suffix for F#. `Implicit` has none.
    pub fn keyword(self, language: Language) -> Option<&'static str> {
        if self == StorageType::Implicit {
            return None;
        }

        let index = self as usize - 1;
        let table: [&'static str; 8] = match language {
            Language::CSharp => ["sbyte", "byte", "short", "ushort", "int", "uint", "long", "ulong"],
            Language::FSharp => ["y", "uy", "s", "us", "l", "u", "L", "UL"],
            Language::VisualBasic => [
                "SByte", "Byte", "Short", "UShort", "Integer", "UInteger", "Long", "ULong",
            ],
            Language::Cil => [
                "int8", "uint8", "int16", "uint16", "int32", "uint32", "int64", "uint64",
            ],
        };
        Some(table[index])
    }

    /// ECMA-335 element type (II.23.1.16) of the underlying field.
    pub fn element_type(self) -> u8 {
        match self {
            StorageType::Signed8Bit    => 0x04,
            StorageType::Unsigned8Bit  => 0x05,
            StorageType::Signed16Bit   => 0x06,
            StorageType::Unsigned16Bit => 0x07,
            StorageType::Implicit |
            StorageType::Signed32Bit   => 0x08,
            StorageType::Unsigned32Bit => 0x09,
            StorageType::Signed64Bit   => 0x0A,
            StorageType::Unsigned64Bit => 0x0B,
        }
    }

    /// Little-endian constant blob for `value`. The caller validates the range first.
    pub fn encode_constant(self, value: i64) -> Vec<u8> {
        let bytes = value.to_le_bytes();
        bytes[..self.size_in_bytes()].to_vec()
    }

    pub fn size_in_bytes(self) -> usize {
        match self {
            StorageType::Signed8Bit | StorageType::Unsigned8Bit => 1,
            StorageType::Signed16Bit | StorageType::Unsigned16Bit => 2,
            StorageType::Implicit | StorageType::Signed32Bit | StorageType::Unsigned32Bit => 4,
            StorageType::Signed64Bit | StorageType::Unsigned64Bit => 8,
        }
    }

    /// Inverse of [`StorageType::element_type`]; `Implicit` is never returned.
    pub fn from_element_type(element_type: u8) -> Option<StorageType> {
        ALL_STORAGE_TYPES
            .iter()
            .skip(1)
            .copied()
            .find(|s| s.element_type() == element_type)
    }

    fn name(self) -> &'static str {
        match self {
            StorageType::Implicit      => "implicit",
            StorageType::Signed8Bit    => "signed8bit",
            StorageType::Unsigned8Bit  => "unsigned8bit",
            StorageType::Signed16Bit   => "signed16bit",
            StorageType::Unsigned16Bit => "unsigned16bit",
            StorageType::Signed32Bit   => "signed32bit",
            StorageType::Unsigned32Bit => "unsigned32bit",
            StorageType::Signed64Bit   => "signed64bit",
            StorageType::Unsigned64Bit => "unsigned64bit",
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        ALL_STORAGE_TYPES
            .iter()
            .copied()
            .find(|t| t.name() == lower)
            .ok_or_else(|| format!("unknown storage type \"{}\"", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_follow_twos_complement() {
        assert_eq!(StorageType::Signed8Bit.min_value(), -128);
        assert_eq!(StorageType::Signed8Bit.max_value(), 127);
        assert_eq!(StorageType::Unsigned16Bit.max_value(), 65535);
        assert_eq!(StorageType::Implicit.min_value(), i32::MIN as i64);
        assert_eq!(StorageType::Unsigned32Bit.max_value(), 4_294_967_295);
        assert_eq!(StorageType::Unsigned64Bit.max_value(), i64::MAX);
    }

    #[test]
    fn validates_values() {
        assert!(StorageType::Unsigned8Bit.validate(0));
        assert!(StorageType::Unsigned8Bit.validate(255));
        assert!(!StorageType::Unsigned8Bit.validate(256));
        assert!(!StorageType::Unsigned8Bit.validate(-1));
        assert!(StorageType::Signed16Bit.validate(-32768));
        assert!(!StorageType::Signed16Bit.validate(32768));
        assert!(!StorageType::Implicit.validate(i32::MAX as i64 + 1));
        assert!(StorageType::Signed64Bit.validate(i64::MIN));
        assert!(!StorageType::Unsigned64Bit.validate(-1));
    }

    #[test]
    fn keywords_per_language() {
        assert_eq!(StorageType::Implicit.keyword(Language::CSharp), None);
        assert_eq!(StorageType::Unsigned8Bit.keyword(Language::CSharp), Some("byte"));
        assert_eq!(StorageType::Signed8Bit.keyword(Language::FSharp), Some("y"));
        assert_eq!(StorageType::Unsigned64Bit.keyword(Language::FSharp), Some("UL"));
        assert_eq!(StorageType::Signed32Bit.keyword(Language::VisualBasic), Some("Integer"));
        assert_eq!(StorageType::Unsigned16Bit.keyword(Language::Cil), Some("uint16"));
    }

    #[test]
    fn constants_are_truncated_little_endian() {
        assert_eq!(StorageType::Signed8Bit.encode_constant(-1), vec![0xFF]);
        assert_eq!(StorageType::Unsigned16Bit.encode_constant(0x1234), vec![0x34, 0x12]);
        assert_eq!(StorageType::Implicit.encode_constant(1), vec![1, 0, 0, 0]);
        assert_eq!(StorageType::Signed64Bit.encode_constant(-2).len(), 8);
    }

    #[test]
    fn element_types_round_trip() {
        for storage in ALL_STORAGE_TYPES.iter().skip(1) {
            assert_eq!(StorageType::from_element_type(storage.element_type()), Some(*storage));
        }
        assert_eq!(StorageType::from_element_type(0x0E), None);
    }

    #[test]
    fn parses_names() {
        assert_eq!("Unsigned8Bit".parse::<StorageType>(), Ok(StorageType::Unsigned8Bit));
        assert_eq!("implicit".parse::<StorageType>(), Ok(StorageType::Implicit));
        assert!("byte".parse::<StorageType>().is_err());
        assert_eq!(StorageType::Signed64Bit.to_string(), "signed64bit");
    }
}
