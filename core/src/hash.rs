//! Structural content hash of an enum definition.
//!
//! The definition is serialized into a canonical, length-prefixed byte form
//! and run through SHA-256; the first 128 bits are kept.

use enumgen_buffer::ByteBufferMut;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::definition::EnumDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    pub fn of(definition: &EnumDefinition) -> ContentHash {
        ContentHash::from_canonical(&canonical_bytes(definition))
    }

    pub(crate) fn from_canonical(bytes: &[u8]) -> ContentHash {
        let digest = Sha256::digest(bytes);
        let mut out = [0u8; 16];
        out.copy_from_slice(&digest[..16]);
        ContentHash(out)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

pub(crate) fn write_text(bb: &mut ByteBufferMut, text: &str) {
    bb.write_var_uint64(text.len() as u64);
    bb.write_bytes(text.as_bytes());
}

pub(crate) fn write_optional_text(bb: &mut ByteBufferMut, text: Option<&str>) {
    match text {
        None => bb.write_byte(0),
        Some(text) => {
            bb.write_byte(1);
            write_text(bb, text);
        }
    }
}

fn canonical_bytes(definition: &EnumDefinition) -> Vec<u8> {
    let mut bb = ByteBufferMut::new();
    write_text(&mut bb, definition.identifier());
    write_optional_text(&mut bb, definition.comment());
    bb.write_var_uint64(definition.len() as u64);
    for entry in definition.entries() {
        write_text(&mut bb, entry.name());
        bb.write_var_int64(entry.value());
        write_optional_text(&mut bb, entry.comment());
    }
    bb.data()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::EnumBuilder;
    use proptest::prelude::*;

    fn definition(name: &str, entries: &[(&str, i64, Option<&str>)]) -> EnumDefinition {
        let mut builder = EnumBuilder::new(name).unwrap();
        for (entry, value, comment) in entries {
            builder
                .push_entry(entry, *value, comment.map(str::to_string))
                .unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn hash_is_128_bits() {
        let hash = definition("TestEnum", &[("A", 1, None)]).content_hash();
        assert_eq!(hash.as_bytes().len() * 8, 128);
        assert_eq!(hash.to_hex().len(), 32);
    }

    #[test]
    fn same_definitions_have_same_hash() {
        let a = definition("TestEnum", &[("A", 1, None), ("B", 2, Some("b"))]);
        let b = definition("TestEnum", &[("A", 1, None), ("B", 2, Some("b"))]);
        assert_eq!(a, b);
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn any_difference_changes_the_hash() {
        let base = definition("TestEnum", &[("A", 1, None), ("B", 2, None)]).content_hash();
        let variants = [
            definition("OtherEnum", &[("A", 1, None), ("B", 2, None)]),
            definition("TestEnum", &[("C", 1, None), ("B", 2, None)]),
            definition("TestEnum", &[("A", 3, None), ("B", 2, None)]),
            definition("TestEnum", &[("A", 1, Some("a")), ("B", 2, None)]),
            definition("TestEnum", &[("A", 1, Some("")), ("B", 2, None)]),
            definition("TestEnum", &[("B", 2, None), ("A", 1, None)]),
            definition("TestEnum", &[("A", 1, None), ("B", 2, None), ("C", 3, None)]),
            definition("TestEnum", &[("A", 1, None)]),
        ];
        for variant in &variants {
            assert_ne!(variant.content_hash(), base, "{:?}", variant);
        }
    }

    #[test]
    fn enum_comment_is_part_of_the_hash() {
        let mut builder = EnumBuilder::new("TestEnum").unwrap();
        builder.push_entry("A", 1, None).unwrap();
        let plain = builder.build().unwrap();
        builder.set_comment(Some("documented".to_string()));
        let documented = builder.build().unwrap();
        assert_ne!(plain.content_hash(), documented.content_hash());
    }

    #[test]
    fn length_prefixes_keep_fields_apart() {
        let a = definition("TestEnum", &[("AB", 1, Some("C"))]);
        let b = definition("TestEnum", &[("A", 1, Some("BC"))]);
        assert_ne!(a.content_hash(), b.content_hash());
    }

    proptest! {
        #[test]
        fn hash_follows_equality(a in any::<i64>(), b in any::<i64>(), comment in proptest::option::of("[a-z ]{0,8}")) {
            let first = definition("TestEnum", &[("A", a, comment.as_deref())]);
            let second = definition("TestEnum", &[("A", b, comment.as_deref())]);
            prop_assert_eq!(first == second, first.content_hash() == second.content_hash());
        }
    }
}
