//! enumgen
//!
//! Generate enums for C#, F#, Visual Basic, CIL and .NET class libraries from
//! json documents.
//!
//! - `generate`: json text → mapped definition → exported bytes
//! - `definition_to_json` / `describe_to_json`: pretty-printed json views of a
//!   definition or of a generated class library
//! - re-exports of the core types

use tracing::info;

pub use enumgen_core::builder::EnumBuilder;
pub use enumgen_core::definition::{EnumDefinition, EnumEntry};
pub use enumgen_core::error::EnumError;
pub use enumgen_core::export::{
    export, CurlyBracketMode, ExportOptions, HeaderMode, OutputKind,
};
pub use enumgen_core::mapping::{map_document, map_enum, MappingContext};
pub use enumgen_core::storage::StorageType;

/// Map `json_text` into an enum called `enum_name` and export it as `kind`.
pub fn generate(
    json_text: &str,
    context: &MappingContext,
    enum_name: &str,
    enum_comment: Option<&str>,
    kind: OutputKind,
    options: &ExportOptions,
) -> Result<Vec<u8>, EnumError> {
    let definition = map_enum(context, json_text, enum_name, enum_comment)?;
    let bytes = export(&definition, kind, options)?;
    info!(
        "Generated {:?} for enum {} ({} entries, {} bytes, hash {})",
        kind,
        definition.identifier(),
        definition.len(),
        bytes.len(),
        definition.content_hash()
    );
    Ok(bytes)
}

/// Pretty-printed json of a definition.
pub fn definition_to_json(definition: &EnumDefinition) -> Result<String, EnumError> {
    serde_json::to_string_pretty(definition).map_err(|e| EnumError::EncodeError(e.to_string()))
}

/// Decode a generated class library into pretty-printed json.
pub fn describe_to_json(image: &[u8]) -> Result<String, EnumError> {
    let description = enumgen_core::describe(image)?;
    serde_json::to_string_pretty(&description).map_err(|e| EnumError::EncodeError(e.to_string()))
}

pub mod identifier {
    pub use enumgen_core::identifier::{try_create_identifier, validate, validate_namespace};
}

pub mod code_builder {
    pub use enumgen_core::code_builder::{IndentMode, NewlineMode, DEFAULT_INDENT_SIZE};
}

pub mod inspect {
    pub use enumgen_core::export::class_library::{
        describe, AssemblyDescription, ConstantDescription, TypeDescription,
    };
}

pub mod buffer {
    pub use enumgen_buffer::{ByteBuffer, ByteBufferMut};
}
