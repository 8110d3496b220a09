//! Read back the enum types declared in a class library written by
//! [`super::export_class_library`].

use std::collections::HashMap;

use enumgen_buffer::ByteBuffer;
use serde::Serialize;

use super::{
    format_guid,
    metadata::{
        coded_index, IndexSizes, ELEMENT_TYPE_VALUETYPE, FIELD_RT_SPECIAL_NAME, HAS_CONSTANT_FIELD,
        METADATA_SIGNATURE, SIG_FIELD, TABLE_ASSEMBLY, TABLE_CONSTANT,
        TABLE_FIELD, TABLE_MODULE, TABLE_TYPE_DEF, TABLE_TYPE_REF, TYPE_DEF_OR_REF_TYPE_REF,
    },
    pe::{CLI_DIRECTORY, PE32_MAGIC},
};
use crate::{error::EnumError, storage::StorageType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyDescription {
    pub assembly_name: String,
    pub module_name:   String,
    pub mvid:          String,
    pub types:         Vec<TypeDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDescription {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name:      String,
    pub storage:   StorageType,
    pub constants: Vec<ConstantDescription>,
}

impl TypeDescription {
    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}.{}", namespace, self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstantDescription {
    pub name:  String,
    pub value: i64,
}

fn decode_error(what: &str) -> impl Fn(()) -> EnumError + '_ {
    move |_| EnumError::DecodeError(what.to_string())
}

struct Section {
    virtual_address: u32,
    virtual_size:    u32,
    raw_size:        u32,
    raw_pointer:     u32,
}

fn rva_to_offset(sections: &[Section], rva: u32) -> Result<usize, EnumError> {
    sections
        .iter()
        .find(|s| rva >= s.virtual_address && rva - s.virtual_address < s.virtual_size.max(s.raw_size))
        .ok_or_else(|| EnumError::DecodeError(format!("address 0x{:x} is outside every section", rva)))
        .and_then(|s| {
            s.raw_pointer
                .checked_add(rva - s.virtual_address)
                .map(|offset| offset as usize)
                .ok_or_else(|| EnumError::DecodeError(format!("address 0x{:x} maps past the end of the file", rva)))
        })
}

/// Locate the metadata root of a PE image.
fn metadata_slice(image: &[u8]) -> Result<&[u8], EnumError> {
    let mut bb = ByteBuffer::new(image);
    if bb.read_bytes(2).map_err(decode_error("truncated DOS header"))? != b"MZ" {
        return Err(EnumError::DecodeError("missing MZ signature".to_string()));
    }
    bb.seek(0x3C).map_err(decode_error("truncated DOS header"))?;
    let pe_offset = bb.read_u32().map_err(decode_error("truncated DOS header"))? as usize;
    bb.seek(pe_offset).map_err(decode_error("invalid PE header offset"))?;
    if bb.read_bytes(4).map_err(decode_error("truncated PE signature"))? != b"PE\0\0" {
        return Err(EnumError::DecodeError("missing PE signature".to_string()));
    }

    bb.read_u16().map_err(decode_error("truncated COFF header"))?;
    let section_count = bb.read_u16().map_err(decode_error("truncated COFF header"))?;
    bb.read_bytes(12).map_err(decode_error("truncated COFF header"))?;
    let optional_size = bb.read_u16().map_err(decode_error("truncated COFF header"))? as usize;
    bb.read_u16().map_err(decode_error("truncated COFF header"))?;

    let optional_start = bb.index();
    if bb.read_u16().map_err(decode_error("truncated optional header"))? != PE32_MAGIC {
        return Err(EnumError::DecodeError("not a PE32 image".to_string()));
    }
    bb.seek(optional_start + 96 + CLI_DIRECTORY * 8)
        .map_err(decode_error("truncated data directories"))?;
    let cli_rva = bb.read_u32().map_err(decode_error("truncated data directories"))?;
    if cli_rva == 0 {
        return Err(EnumError::DecodeError("image has no CLI header".to_string()));
    }

    bb.seek(optional_start + optional_size).map_err(decode_error("truncated section table"))?;
    let mut sections = Vec::with_capacity(section_count as usize);
    for _ in 0..section_count {
        bb.read_bytes(8).map_err(decode_error("truncated section header"))?;
        let virtual_size = bb.read_u32().map_err(decode_error("truncated section header"))?;
        let virtual_address = bb.read_u32().map_err(decode_error("truncated section header"))?;
        let raw_size = bb.read_u32().map_err(decode_error("truncated section header"))?;
        let raw_pointer = bb.read_u32().map_err(decode_error("truncated section header"))?;
        bb.read_bytes(16).map_err(decode_error("truncated section header"))?;
        sections.push(Section {
            virtual_address,
            virtual_size,
            raw_size,
            raw_pointer,
        });
    }

    bb.seek(rva_to_offset(&sections, cli_rva)?).map_err(decode_error("truncated CLI header"))?;
    bb.read_bytes(8).map_err(decode_error("truncated CLI header"))?;
    let metadata_rva = bb.read_u32().map_err(decode_error("truncated CLI header"))?;
    let metadata_size = bb.read_u32().map_err(decode_error("truncated CLI header"))? as usize;

    bb.seek(rva_to_offset(&sections, metadata_rva)?).map_err(decode_error("truncated metadata"))?;
    bb.read_bytes(metadata_size).map_err(decode_error("truncated metadata"))
}

fn read_streams(metadata: &[u8]) -> Result<HashMap<String, &[u8]>, EnumError> {
    let mut bb = ByteBuffer::new(metadata);
    if bb.read_u32().map_err(decode_error("truncated metadata root"))? != METADATA_SIGNATURE {
        return Err(EnumError::DecodeError("invalid metadata signature".to_string()));
    }
    bb.read_bytes(8).map_err(decode_error("truncated metadata root"))?;
    let version_len = bb.read_u32().map_err(decode_error("truncated metadata root"))? as usize;
    bb.read_bytes(version_len).map_err(decode_error("truncated metadata version"))?;
    bb.read_u16().map_err(decode_error("truncated metadata root"))?;
    let stream_count = bb.read_u16().map_err(decode_error("truncated metadata root"))?;

    let mut streams = HashMap::new();
    for _ in 0..stream_count {
        let offset = bb.read_u32().map_err(decode_error("truncated stream header"))? as usize;
        let size = bb.read_u32().map_err(decode_error("truncated stream header"))? as usize;
        let name = bb.read_string().map_err(decode_error("truncated stream name"))?.into_owned();
        let aligned = (bb.index() + 3) & !3;
        bb.seek(aligned).map_err(decode_error("truncated stream header"))?;

        let data = offset
            .checked_add(size)
            .and_then(|end| metadata.get(offset..end))
            .ok_or_else(|| EnumError::DecodeError(format!("stream {} is out of bounds", name)))?;
        streams.insert(name, data);
    }
    Ok(streams)
}

struct Heaps<'a> {
    strings: &'a [u8],
    guids:   &'a [u8],
    blobs:   &'a [u8],
}

impl<'a> Heaps<'a> {
    fn string(&self, index: u32) -> Result<String, EnumError> {
        let mut bb = ByteBuffer::new(self.strings);
        bb.seek(index as usize).map_err(decode_error("string index out of bounds"))?;
        Ok(bb.read_string().map_err(decode_error("unterminated string"))?.into_owned())
    }

    fn guid(&self, index: u32) -> Result<[u8; 16], EnumError> {
        let start = (index as usize)
            .checked_sub(1)
            .ok_or_else(|| EnumError::DecodeError("null guid index".to_string()))?
            * 16;
        let mut guid = [0u8; 16];
        let bytes = self
            .guids
            .get(start..start + 16)
            .ok_or_else(|| EnumError::DecodeError(format!("guid index {} out of bounds", index)))?;
        guid.copy_from_slice(bytes);
        Ok(guid)
    }

    fn blob(&self, index: u32) -> Result<&'a [u8], EnumError> {
        let mut bb = ByteBuffer::new(self.blobs);
        bb.seek(index as usize).map_err(decode_error("blob index out of bounds"))?;
        let len = bb.read_compressed_uint().map_err(decode_error("invalid blob length"))?;
        bb.read_bytes(len as usize).map_err(decode_error("truncated blob"))
    }
}

fn read_index(bb: &mut ByteBuffer, wide: bool) -> Result<u32, EnumError> {
    if wide {
        bb.read_u32().map_err(decode_error("truncated table row"))
    } else {
        bb.read_u16().map(u32::from).map_err(decode_error("truncated table row"))
    }
}

struct TypeDefRow {
    name:       u32,
    namespace:  u32,
    extends:    u32,
    field_list: u32,
}

struct FieldRow {
    flags:     u16,
    name:      u32,
    signature: u32,
}

struct Tables {
    module_name:   u32,
    mvid:          u32,
    type_refs:     Vec<(u32, u32)>,
    type_defs:     Vec<TypeDefRow>,
    fields:        Vec<FieldRow>,
    constants:     HashMap<u32, (u8, u32)>,
    assembly_name: Option<u32>,
}

fn read_tables(stream: &[u8]) -> Result<Tables, EnumError> {
    let mut bb = ByteBuffer::new(stream);
    bb.read_bytes(6).map_err(decode_error("truncated table stream"))?;
    let heap_sizes = bb.read_byte().map_err(decode_error("truncated table stream"))?;
    bb.read_byte().map_err(decode_error("truncated table stream"))?;
    let valid = bb.read_u64().map_err(decode_error("truncated table stream"))?;
    bb.read_u64().map_err(decode_error("truncated table stream"))?;

    let mut rows = [0u32; 64];
    for (table, count) in rows.iter_mut().enumerate() {
        if valid & (1 << table) != 0 {
            *count = bb.read_u32().map_err(decode_error("truncated row counts"))?;
        }
    }
    let sizes = IndexSizes::new(heap_sizes, &rows);

    let mut tables = Tables {
        module_name:   0,
        mvid:          0,
        type_refs:     Vec::new(),
        type_defs:     Vec::new(),
        fields:        Vec::new(),
        constants:     HashMap::new(),
        assembly_name: None,
    };

    for table in (0..64).filter(|t| valid & (1u64 << t) != 0) {
        let row_size = sizes
            .row_size(table)
            .ok_or_else(|| EnumError::DecodeError(format!("unsupported metadata table 0x{:02x}", table)))?;
        for _ in 0..rows[table] {
            let row_start = bb.index();
            match table {
                TABLE_MODULE => {
                    bb.read_u16().map_err(decode_error("truncated table row"))?;
                    tables.module_name = read_index(&mut bb, sizes.strings)?;
                    tables.mvid = read_index(&mut bb, sizes.guid)?;
                }
                TABLE_TYPE_REF => {
                    read_index(&mut bb, sizes.resolution_scope)?;
                    let name = read_index(&mut bb, sizes.strings)?;
                    let namespace = read_index(&mut bb, sizes.strings)?;
                    tables.type_refs.push((name, namespace));
                }
                TABLE_TYPE_DEF => {
                    bb.read_u32().map_err(decode_error("truncated table row"))?;
                    let name = read_index(&mut bb, sizes.strings)?;
                    let namespace = read_index(&mut bb, sizes.strings)?;
                    let extends = read_index(&mut bb, sizes.type_def_or_ref)?;
                    let field_list = read_index(&mut bb, sizes.field)?;
                    tables.type_defs.push(TypeDefRow {
                        name,
                        namespace,
                        extends,
                        field_list,
                    });
                }
                TABLE_FIELD => {
                    let flags = bb.read_u16().map_err(decode_error("truncated table row"))?;
                    let name = read_index(&mut bb, sizes.strings)?;
                    let signature = read_index(&mut bb, sizes.blob)?;
                    tables.fields.push(FieldRow { flags, name, signature });
                }
                TABLE_CONSTANT => {
                    let element_type = bb.read_byte().map_err(decode_error("truncated table row"))?;
                    bb.read_byte().map_err(decode_error("truncated table row"))?;
                    let parent = read_index(&mut bb, sizes.has_constant)?;
                    let value = read_index(&mut bb, sizes.blob)?;
                    tables.constants.insert(parent, (element_type, value));
                }
                TABLE_ASSEMBLY => {
                    bb.read_bytes(16).map_err(decode_error("truncated table row"))?;
                    read_index(&mut bb, sizes.blob)?;
                    tables.assembly_name = Some(read_index(&mut bb, sizes.strings)?);
                }
                _ => {}
            }
            bb.seek(row_start + row_size).map_err(decode_error("truncated table row"))?;
        }
    }
    Ok(tables)
}

fn decode_constant(storage: StorageType, bytes: &[u8]) -> Result<i64, EnumError> {
    if bytes.len() != storage.size_in_bytes() {
        return Err(EnumError::DecodeError(format!(
            "constant of {} bytes for storage type {}",
            bytes.len(),
            storage
        )));
    }
    let mut wide = [0u8; 8];
    wide[..bytes.len()].copy_from_slice(bytes);
    let raw = u64::from_le_bytes(wide);
    let value = match storage {
        StorageType::Signed8Bit => raw as u8 as i8 as i64,
        StorageType::Signed16Bit => raw as u16 as i16 as i64,
        StorageType::Implicit | StorageType::Signed32Bit => raw as u32 as i32 as i64,
        _ => raw as i64,
    };
    Ok(value)
}

/// Describe every enum type of `image`. Anything not laid out the way the
/// exporter writes it is reported as [`EnumError::DecodeError`].
pub fn describe(image: &[u8]) -> Result<AssemblyDescription, EnumError> {
    let metadata = metadata_slice(image)?;
    let streams = read_streams(metadata)?;
    let stream = |name: &str| {
        streams
            .get(name)
            .copied()
            .ok_or_else(|| EnumError::DecodeError(format!("missing {} stream", name)))
    };
    let heaps = Heaps {
        strings: stream("#Strings")?,
        guids:   stream("#GUID")?,
        blobs:   stream("#Blob")?,
    };
    let tables = read_tables(stream("#~")?)?;

    let enum_ref = tables
        .type_refs
        .iter()
        .position(|&(name, namespace)| {
            matches!(
                (heaps.string(name), heaps.string(namespace)),
                (Ok(name), Ok(namespace)) if name == "Enum" && namespace == "System"
            )
        })
        .map(|i| coded_index(i as u32 + 1, TYPE_DEF_OR_REF_TYPE_REF, 2));

    let mut types = Vec::new();
    for (i, type_def) in tables.type_defs.iter().enumerate() {
        if enum_ref != Some(type_def.extends) {
            continue;
        }

        let first = type_def.field_list as usize;
        let end = match tables.type_defs.get(i + 1) {
            Some(next) => next.field_list as usize,
            None => tables.fields.len() + 1,
        };

        if first == 0 || first > end {
            return Err(EnumError::DecodeError(format!(
                "type {} has an invalid field list {}..{}",
                i + 1,
                first,
                end
            )));
        }

        let mut storage = None;
        let mut constants = Vec::new();
        for row in first..end {
            let field = row
                .checked_sub(1)
                .and_then(|index| tables.fields.get(index))
                .ok_or_else(|| EnumError::DecodeError(format!("field row {} out of bounds", row)))?;
            let name = heaps.string(field.name)?;
            let signature = heaps.blob(field.signature)?;

            if field.flags & FIELD_RT_SPECIAL_NAME != 0 {
                storage = match signature {
                    [SIG_FIELD, element_type] => StorageType::from_element_type(*element_type),
                    _ => None,
                };
                continue;
            }
            if !matches!(signature, [SIG_FIELD, ELEMENT_TYPE_VALUETYPE, ..]) {
                continue;
            }

            let storage = storage
                .ok_or_else(|| EnumError::DecodeError(format!("literal {} precedes value__", name)))?;
            let parent = coded_index(row as u32, HAS_CONSTANT_FIELD, 2);
            let (_, value) = tables
                .constants
                .get(&parent)
                .ok_or_else(|| EnumError::DecodeError(format!("literal {} has no constant", name)))?;
            let value = decode_constant(storage, heaps.blob(*value)?)?;
            constants.push(ConstantDescription { name, value });
        }

        let namespace = heaps.string(type_def.namespace)?;
        types.push(TypeDescription {
            namespace: Some(namespace).filter(|ns| !ns.is_empty()),
            name: heaps.string(type_def.name)?,
            storage: storage.ok_or_else(|| EnumError::DecodeError("enum without value__ field".to_string()))?,
            constants,
        });
    }

    let assembly_name = tables
        .assembly_name
        .ok_or_else(|| EnumError::DecodeError("image has no assembly manifest".to_string()))?;
    Ok(AssemblyDescription {
        assembly_name: heaps.string(assembly_name)?,
        module_name:   heaps.string(tables.module_name)?,
        mvid:          format_guid(&heaps.guid(tables.mvid)?),
        types,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_images() {
        assert!(matches!(describe(b""), Err(EnumError::DecodeError(_))));
        assert!(matches!(describe(b"MZ"), Err(EnumError::DecodeError(_))));
        assert!(matches!(describe(&[0u8; 512]), Err(EnumError::DecodeError(_))));
    }

    #[test]
    fn section_offsets_do_not_overflow() {
        let sections = [Section {
            virtual_address: 0x2000,
            virtual_size:    0x1000,
            raw_size:        0x1000,
            raw_pointer:     u32::MAX - 4,
        }];
        assert_eq!(rva_to_offset(&sections, 0x2002).unwrap(), u32::MAX as usize - 2);
        assert!(matches!(rva_to_offset(&sections, 0x2010), Err(EnumError::DecodeError(_))));
        assert!(matches!(rva_to_offset(&sections, 0x1000), Err(EnumError::DecodeError(_))));
    }

    #[test]
    fn constants_are_sign_extended() {
        assert_eq!(decode_constant(StorageType::Signed8Bit, &[0xFF]).unwrap(), -1);
        assert_eq!(decode_constant(StorageType::Unsigned8Bit, &[0xFF]).unwrap(), 255);
        assert_eq!(decode_constant(StorageType::Signed16Bit, &[0x00, 0x80]).unwrap(), -32768);
        assert_eq!(decode_constant(StorageType::Signed32Bit, &[0xFE, 0xFF, 0xFF, 0xFF]).unwrap(), -2);
        assert_eq!(
            decode_constant(StorageType::Unsigned32Bit, &[0xFF, 0xFF, 0xFF, 0xFF]).unwrap(),
            4_294_967_295
        );
        assert!(decode_constant(StorageType::Signed64Bit, &[1, 2]).is_err());
    }
}
