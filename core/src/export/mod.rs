//! Exporters turning an [`EnumDefinition`] into source text or a binary module.
//!
//! Each output kind is an independent function; [`export`] is the single
//! dispatch point.

pub mod cil;
pub mod class_library;
pub mod csharp;
pub mod fsharp;
pub mod visual_basic;

use crate::{
    code_builder::{CodeBuilder, IndentMode, NewlineMode, DEFAULT_INDENT_SIZE},
    definition::{EnumDefinition, EnumEntry},
    error::EnumError,
    identifier,
    storage::StorageType,
    utils::collapse_newlines,
};

pub use cil::export_cil;
pub use class_library::export_class_library;
pub use csharp::export_csharp;
pub use fsharp::export_fsharp;
pub use visual_basic::export_visual_basic;

/// Name and version written into generated headers and attributes.
pub const GENERATOR_NAME: &str = "enumgen";
pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Source languages with a text exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    CSharp,
    FSharp,
    VisualBasic,
    Cil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    CSharp,
    FSharp,
    VisualBasic,
    Cil,
    ClassLibrary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderMode {
    /// An `<auto-generated>` banner naming the generator.
    #[default]
    Default,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurlyBracketMode {
    /// Opening bracket on its own line.
    #[default]
    NewLine,
    /// Opening bracket at the end of the declaration line.
    SameLine,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub namespace:     Option<String>,
    pub header:        HeaderMode,
    pub indent:        IndentMode,
    pub indent_size:   usize,
    pub newline:       NewlineMode,
    pub storage:       StorageType,
    pub curly_bracket: CurlyBracketMode,
    /// Used by the CIL and class-library outputs; defaults to the enum identifier.
    pub assembly_name: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            namespace:     None,
            header:        HeaderMode::Default,
            indent:        IndentMode::Spaces,
            indent_size:   DEFAULT_INDENT_SIZE,
            newline:       NewlineMode::Unix,
            storage:       StorageType::Implicit,
            curly_bracket: CurlyBracketMode::NewLine,
            assembly_name: None,
        }
    }
}

impl ExportOptions {
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    pub fn with_storage(mut self, storage: StorageType) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_assembly_name(mut self, assembly_name: &str) -> Self {
        self.assembly_name = Some(assembly_name.to_string());
        self
    }

    pub(crate) fn code_builder(&self) -> CodeBuilder {
        CodeBuilder::new(self.indent, self.indent_size, self.newline)
    }
}

/// Render `definition` as `kind`. Text outputs are UTF-8 without a byte-order mark.
pub fn export(
    definition: &EnumDefinition,
    kind: OutputKind,
    options: &ExportOptions,
) -> Result<Vec<u8>, EnumError> {
    match kind {
        OutputKind::CSharp       => export_csharp(definition, options).map(String::into_bytes),
        OutputKind::FSharp       => export_fsharp(definition, options).map(String::into_bytes),
        OutputKind::VisualBasic  => export_visual_basic(definition, options).map(String::into_bytes),
        OutputKind::Cil          => export_cil(definition, options).map(String::into_bytes),
        OutputKind::ClassLibrary => export_class_library(definition, options),
    }
}

/// The namespace to emit, if any. Empty strings count as absent.
pub(crate) fn check_namespace(namespace: Option<&str>) -> Result<Option<&str>, EnumError> {
    match namespace {
        None | Some("") => Ok(None),
        Some(ns) if identifier::validate_namespace(ns) => Ok(Some(ns)),
        Some(ns) => Err(EnumError::InvalidNamespace(ns.to_string())),
    }
}

pub(crate) fn check_assembly_name<'a>(
    options: &'a ExportOptions,
    definition: &'a EnumDefinition,
) -> Result<&'a str, EnumError> {
    let name = options.assembly_name.as_deref().unwrap_or(definition.identifier());
    if identifier::validate(name) {
        Ok(name)
    } else {
        Err(EnumError::InvalidAssemblyName(name.to_string()))
    }
}

/// Fails on the first entry whose value `storage` cannot hold.
pub(crate) fn check_values(definition: &EnumDefinition, storage: StorageType) -> Result<(), EnumError> {
    match definition.entries().iter().find(|e| !storage.validate(e.value())) {
        Some(entry) => Err(EnumError::OutOfBoundsValue {
            storage,
            value: entry.value(),
        }),
        None => Ok(()),
    }
}

/// Consecutive entries are separated by a blank line when either is documented.
pub(crate) fn needs_separator(previous: Option<&EnumEntry>, entry: &EnumEntry) -> bool {
    match previous {
        Some(previous) => previous.documentation().is_some() || entry.documentation().is_some(),
        None => false,
    }
}

pub(crate) fn write_header(builder: &mut CodeBuilder, marker: &str) {
    let rule = format!("{}{}", marker, "-".repeat(78));
    let prefix = format!("{} ", marker);
    builder.write_line(&rule);
    builder.write_line_with("<auto-generated>", &prefix, 0);
    builder.write_line_with(
        &format!("Generated by: {} - {}", GENERATOR_NAME, GENERATOR_VERSION),
        &prefix,
        1,
    );
    builder.write_line_with("</auto-generated>", &prefix, 0);
    builder.write_line(&rule);
}

/// `<summary>` documentation block using `marker` (`///` or `'''`).
pub(crate) fn write_summary(builder: &mut CodeBuilder, marker: &str, text: &str, additional_indent: usize) {
    builder.write_line_with(&format!("{} <summary>", marker), "", additional_indent);
    builder.write_line_with(&format!("{} {}", marker, collapse_newlines(text)), "", additional_indent);
    builder.write_line_with(&format!("{} </summary>", marker), "", additional_indent);
}

pub(crate) fn open_scope(builder: &mut CodeBuilder, declaration: &str, mode: CurlyBracketMode) {
    match mode {
        CurlyBracketMode::NewLine => {
            builder.write_line(declaration);
            builder.write_line("{");
        }
        CurlyBracketMode::SameLine => builder.write_line(&format!("{} {{", declaration)),
    }
    builder.begin_indent();
}

pub(crate) fn close_scope(builder: &mut CodeBuilder) {
    builder.end_indent();
    builder.write_line("}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::EnumBuilder;

    #[test]
    fn namespace_checks() {
        assert_eq!(check_namespace(None).unwrap(), None);
        assert_eq!(check_namespace(Some("")).unwrap(), None);
        assert_eq!(check_namespace(Some("A.B")).unwrap(), Some("A.B"));
        assert!(matches!(check_namespace(Some("A..B")), Err(EnumError::InvalidNamespace(_))));
    }

    #[test]
    fn dispatch_covers_every_kind() {
        let mut builder = EnumBuilder::new("TestEnum").unwrap();
        builder.push_entry("A", 1, None).unwrap();
        let definition = builder.build().unwrap();
        let options = ExportOptions::default();

        for kind in [
            OutputKind::CSharp,
            OutputKind::FSharp,
            OutputKind::VisualBasic,
            OutputKind::Cil,
            OutputKind::ClassLibrary,
        ] {
            let bytes = export(&definition, kind, &options).unwrap();
            assert!(!bytes.is_empty(), "{:?}", kind);
            assert_ne!(&bytes[..3], &[0xEF, 0xBB, 0xBF], "{:?} starts with a BOM", kind);
        }
    }

    #[test]
    fn out_of_bounds_names_the_value() {
        let mut builder = EnumBuilder::new("TestEnum").unwrap();
        builder.push_entry("A", 1, None).unwrap();
        builder.push_entry("B", 300, None).unwrap();
        builder.push_entry("C", -5, None).unwrap();
        let definition = builder.build().unwrap();

        let err = check_values(&definition, StorageType::Unsigned8Bit).unwrap_err();
        assert!(matches!(
            err,
            EnumError::OutOfBoundsValue { storage: StorageType::Unsigned8Bit, value: 300 }
        ));
    }
}
