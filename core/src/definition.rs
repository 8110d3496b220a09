use serde::Serialize;

use crate::hash::ContentHash;

/// A single named constant of an [`EnumDefinition`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EnumEntry {
    name:    String,
    value:   i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
}

impl EnumEntry {
    pub fn new(name: impl Into<String>, value: i64, comment: Option<String>) -> Self {
        EnumEntry {
            name: name.into(),
            value,
            comment,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// The comment if it has any content.
    pub(crate) fn documentation(&self) -> Option<&str> {
        self.comment().filter(|c| !c.is_empty())
    }
}

/// Immutable, validated enum: a valid identifier, at least one entry, and
/// pairwise unique entry names and values. Only [`crate::builder::EnumBuilder`]
/// creates these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EnumDefinition {
    identifier: String,
    entries:    Vec<EnumEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment:    Option<String>,
}

impl EnumDefinition {
    pub(crate) fn new(identifier: String, entries: Vec<EnumEntry>, comment: Option<String>) -> Self {
        EnumDefinition {
            identifier,
            entries,
            comment,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[EnumEntry] {
        &self.entries
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub(crate) fn documentation(&self) -> Option<&str> {
        self.comment().filter(|c| !c.is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// A built definition always has entries, so this is `false`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, name: &str) -> Option<&EnumEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn has_entry(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    pub fn has_value(&self, value: i64) -> bool {
        self.entries.iter().any(|e| e.value == value)
    }

    /// Structural 128-bit digest, see [`ContentHash`].
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::of(self)
    }
}
