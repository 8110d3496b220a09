//! A .NET class library (PE32 DLL with CLI metadata) declaring the enum.
//!
//! The image is a pure function of its inputs: the COFF timestamp is zero and
//! the module version id is derived from the definition's content hash, the
//! assembly name, the namespace and the storage type.

pub mod inspect;
mod metadata;
mod pe;

use enumgen_buffer::ByteBufferMut;
use tracing::debug;

use crate::{
    definition::EnumDefinition,
    error::EnumError,
    export::{check_assembly_name, check_namespace, check_values, ExportOptions},
    hash::{write_optional_text, write_text, ContentHash},
    storage::StorageType,
};

pub use inspect::{describe, AssemblyDescription, ConstantDescription, TypeDescription};

pub fn export_class_library(definition: &EnumDefinition, options: &ExportOptions) -> Result<Vec<u8>, EnumError> {
    let namespace = check_namespace(options.namespace.as_deref())?;
    let assembly_name = check_assembly_name(options, definition)?;
    check_values(definition, options.storage)?;

    let mvid = module_version_id(definition, assembly_name, namespace, options.storage);
    let metadata = metadata::build_metadata(&metadata::ModuleSpec {
        assembly_name,
        namespace,
        type_name: definition.identifier(),
        storage: options.storage,
        entries: definition.entries(),
        mvid,
    })?;
    let image = pe::build_image(&metadata);

    debug!(
        "Class library {}.dll: {} bytes, metadata {} bytes, mvid {}",
        assembly_name,
        image.len(),
        metadata.len(),
        format_guid(&mvid)
    );
    Ok(image)
}

/// Version 4 style GUID from a digest of everything that shapes the module.
fn module_version_id(
    definition: &EnumDefinition,
    assembly_name: &str,
    namespace: Option<&str>,
    storage: StorageType,
) -> [u8; 16] {
    let mut bb = ByteBufferMut::new();
    bb.write_bytes(definition.content_hash().as_bytes());
    write_text(&mut bb, assembly_name);
    write_optional_text(&mut bb, namespace);
    bb.write_byte(storage as u8);

    let mut guid = *ContentHash::from_canonical(bb.as_slice()).as_bytes();
    guid[7] = (guid[7] & 0x0F) | 0x40;
    guid[8] = (guid[8] & 0x3F) | 0x80;
    guid
}

/// Registry format, with the first three groups little-endian as stored.
pub(crate) fn format_guid(guid: &[u8; 16]) -> String {
    format!(
        "{:08x}-{:04x}-{:04x}-{}-{}",
        u32::from_le_bytes([guid[0], guid[1], guid[2], guid[3]]),
        u16::from_le_bytes([guid[4], guid[5]]),
        u16::from_le_bytes([guid[6], guid[7]]),
        hex(&guid[8..10]),
        hex(&guid[10..16])
    )
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
