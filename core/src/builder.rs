use std::collections::HashSet;

use crate::{
    definition::{EnumDefinition, EnumEntry},
    error::EnumError,
    identifier,
};

/// Mutable, append-only constructor for [`EnumDefinition`].
///
/// Names and values are checked on every push, non-emptiness on `build`.
/// A failed push leaves the builder unchanged, and `build` takes a snapshot
/// so the builder can keep accumulating afterwards.
#[derive(Debug, Clone)]
pub struct EnumBuilder {
    name:    String,
    comment: Option<String>,
    entries: Vec<EnumEntry>,
    names:   HashSet<String>,
    values:  HashSet<i64>,
}

impl EnumBuilder {
    pub fn new(name: &str) -> Result<Self, EnumError> {
        if !identifier::validate(name) {
            return Err(EnumError::InvalidName(name.to_string()));
        }

        Ok(EnumBuilder {
            name:    name.to_string(),
            comment: None,
            entries: Vec::new(),
            names:   HashSet::new(),
            values:  HashSet::new(),
        })
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn has_entry(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn has_value(&self, value: i64) -> bool {
        self.values.contains(&value)
    }

    pub fn push_entry(
        &mut self,
        name: &str,
        value: i64,
        comment: Option<String>,
    ) -> Result<(), EnumError> {
        if !identifier::validate(name) {
            return Err(EnumError::InvalidEntryName(name.to_string()));
        }
        if self.has_entry(name) {
            return Err(EnumError::DuplicateName {
                enum_name: self.name.clone(),
                name:      name.to_string(),
            });
        }
        if self.has_value(value) {
            return Err(EnumError::DuplicateValue {
                enum_name: self.name.clone(),
                value,
            });
        }

        self.names.insert(name.to_string());
        self.values.insert(value);
        self.entries.push(EnumEntry::new(name, value, comment));
        Ok(())
    }

    pub fn build(&self) -> Result<EnumDefinition, EnumError> {
        if self.entries.is_empty() {
            return Err(EnumError::EmptyDefinition(self.name.clone()));
        }

        Ok(EnumDefinition::new(
            self.name.clone(),
            self.entries.clone(),
            self.comment.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_invalid_enum_name() {
        assert!(matches!(EnumBuilder::new("0Enum"), Err(EnumError::InvalidName(_))));
        assert!(matches!(EnumBuilder::new(""), Err(EnumError::InvalidName(_))));
    }

    #[test]
    fn rejects_invalid_entry_name() {
        let mut builder = EnumBuilder::new("TestEnum").unwrap();
        let err = builder.push_entry("entry a", 1, None).unwrap_err();
        assert!(matches!(err, EnumError::InvalidEntryName(name) if name == "entry a"));
        assert_eq!(builder.entry_count(), 0);
    }

    #[test]
    fn rejects_duplicate_names_and_values() {
        let mut builder = EnumBuilder::new("TestEnum").unwrap();
        builder.push_entry("A", 1, None).unwrap();

        let err = builder.push_entry("A", 2, None).unwrap_err();
        assert!(matches!(err, EnumError::DuplicateName { ref name, .. } if name == "A"));
        let err = builder.push_entry("B", 1, None).unwrap_err();
        assert!(matches!(err, EnumError::DuplicateValue { value: 1, .. }));

        assert_eq!(builder.entry_count(), 1);
        assert!(!builder.has_entry("B"));
        assert!(!builder.has_value(2));
    }

    #[test]
    fn empty_builder_fails_to_build() {
        let builder = EnumBuilder::new("TestEnum").unwrap();
        assert!(matches!(builder.build(), Err(EnumError::EmptyDefinition(name)) if name == "TestEnum"));
    }

    #[test]
    fn build_is_a_snapshot() {
        let mut builder = EnumBuilder::new("TestEnum")
            .unwrap()
            .with_comment(Some("Test enum".to_string()));
        builder.push_entry("A", 1, Some("First".to_string())).unwrap();
        let first = builder.build().unwrap();

        builder.push_entry("B", 2, None).unwrap();
        let second = builder.build().unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
        assert_eq!(first.comment(), Some("Test enum"));
        assert_eq!(first.entries()[0].comment(), Some("First"));
        assert_eq!(second.entries()[1], EnumEntry::new("B", 2, None));
    }

    #[test]
    fn entries_keep_insertion_order() {
        let mut builder = EnumBuilder::new("TestEnum").unwrap();
        for (name, value) in [("Z", 9), ("A", -3), ("M", 0)] {
            builder.push_entry(name, value, None).unwrap();
        }
        let definition = builder.build().unwrap();
        let names: Vec<&str> = definition.entries().iter().map(|e| e.name()).collect();
        assert_eq!(names, ["Z", "A", "M"]);
    }

    proptest! {
        #[test]
        fn unique_entries_always_build(values in proptest::collection::hash_set(any::<i64>(), 1..32)) {
            let mut builder = EnumBuilder::new("TestEnum").unwrap();
            let values: Vec<i64> = values.into_iter().collect();
            for (i, value) in values.iter().enumerate() {
                builder.push_entry(&format!("Entry{}", i), *value, None).unwrap();
            }

            let definition = builder.build().unwrap();
            prop_assert_eq!(definition.len(), values.len());
            for (i, value) in values.iter().enumerate() {
                let name = format!("Entry{}", i);
                prop_assert!(definition.has_entry(&name));
                prop_assert!(definition.has_value(*value));
                prop_assert_eq!(definition.entries()[i].value(), *value);
            }
        }

        #[test]
        fn failed_pushes_leave_no_trace(value in any::<i64>(), other in any::<i64>()) {
            prop_assume!(value != other);
            let mut builder = EnumBuilder::new("TestEnum").unwrap();
            builder.push_entry("A", value, None).unwrap();
            let before = builder.build().unwrap();

            prop_assert!(builder.push_entry("A", other, None).is_err());
            prop_assert!(builder.push_entry("B", value, None).is_err());
            prop_assert_eq!(builder.build().unwrap(), before);
            prop_assert!(!builder.has_value(other));
        }
    }
}
