//! enumgen-core
//!
//! This crate implements:
//!  1) Identifier validation and conversion of arbitrary names,
//!  2) `EnumBuilder` → immutable `EnumDefinition` (unique names and values),
//!  3) The json mapping engine (`map_enum`) driven by small path expressions,
//!  4) Exporters for C#, F#, Visual Basic, CIL and .NET class libraries,
//!  5) A structural content hash and the `EnumError` type.

pub mod error;
pub mod utils;
pub mod identifier;
pub mod storage;
pub mod code_builder;
pub mod definition;
pub mod hash;
pub mod builder;
pub mod mapping;
pub mod export;

pub use builder::EnumBuilder;
pub use definition::{EnumDefinition, EnumEntry};
pub use error::EnumError;
pub use export::export;
pub use export::class_library::describe;
pub use hash::ContentHash;
pub use mapping::{map_document, map_enum, MappingContext};
pub use storage::StorageType;
