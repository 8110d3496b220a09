//! ECMA-335 metadata (partition II.24) for a module declaring one enum type.

use std::collections::HashMap;

use enumgen_buffer::ByteBufferMut;

use crate::{definition::EnumEntry, error::EnumError, storage::StorageType};

pub(crate) const METADATA_SIGNATURE: u32 = 0x424A_5342;
pub(crate) const METADATA_VERSION: &str = "v4.0.30319";

// Table numbers, II.22.
pub(crate) const TABLE_MODULE: usize = 0x00;
pub(crate) const TABLE_TYPE_REF: usize = 0x01;
pub(crate) const TABLE_TYPE_DEF: usize = 0x02;
pub(crate) const TABLE_FIELD: usize = 0x04;
pub(crate) const TABLE_METHOD_DEF: usize = 0x06;
pub(crate) const TABLE_PARAM: usize = 0x08;
pub(crate) const TABLE_CONSTANT: usize = 0x0B;
pub(crate) const TABLE_PROPERTY: usize = 0x17;
pub(crate) const TABLE_MODULE_REF: usize = 0x1A;
pub(crate) const TABLE_TYPE_SPEC: usize = 0x1B;
pub(crate) const TABLE_ASSEMBLY: usize = 0x20;
pub(crate) const TABLE_ASSEMBLY_REF: usize = 0x23;

/// Tables this module writes, in stream order.
pub(crate) const EMITTED_TABLES: [usize; 7] = [
    TABLE_MODULE,
    TABLE_TYPE_REF,
    TABLE_TYPE_DEF,
    TABLE_FIELD,
    TABLE_CONSTANT,
    TABLE_ASSEMBLY,
    TABLE_ASSEMBLY_REF,
];

const SORTED_TABLES: u64 = 0x0000_1600_3301_FA00;

pub(crate) const TYPE_PUBLIC_SEALED: u32 = 0x0000_0101;
pub(crate) const FIELD_RT_SPECIAL_NAME: u16 = 0x0400;
pub(crate) const FIELD_ENUM_VALUE: u16 = 0x0606;
pub(crate) const FIELD_LITERAL: u16 = 0x8056;

pub(crate) const SIG_FIELD: u8 = 0x06;
pub(crate) const ELEMENT_TYPE_VALUETYPE: u8 = 0x11;

const HASH_ALGORITHM_SHA1: u32 = 0x8004;
pub(crate) const MSCORLIB_PUBLIC_KEY_TOKEN: [u8; 8] = [0xB7, 0x7A, 0x5C, 0x56, 0x19, 0x34, 0xE0, 0x89];

/// TypeDef row 1 is `<Module>`, the enum is row 2.
const ENUM_TYPE_DEF_ROW: u32 = 2;
const SYSTEM_ENUM_TYPE_REF_ROW: u32 = 1;
const MSCORLIB_ASSEMBLY_REF_ROW: u32 = 1;

// Coded index tags, II.24.2.6.
pub(crate) const TYPE_DEF_OR_REF_TYPE_REF: u32 = 1;
pub(crate) const HAS_CONSTANT_FIELD: u32 = 0;
const RESOLUTION_SCOPE_ASSEMBLY_REF: u32 = 2;

pub(crate) fn coded_index(row: u32, tag: u32, tag_bits: u32) -> u32 {
    (row << tag_bits) | tag
}

/// Width of every index column, derived from heap sizes and row counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IndexSizes {
    pub strings:          bool,
    pub guid:             bool,
    pub blob:             bool,
    pub field:            bool,
    pub method:           bool,
    pub type_def_or_ref:  bool,
    pub has_constant:     bool,
    pub resolution_scope: bool,
}

impl IndexSizes {
    pub fn new(heap_sizes: u8, rows: &[u32; 64]) -> IndexSizes {
        let coded = |tables: &[usize]| tables.iter().any(|&t| rows[t] >= 1 << 14);
        IndexSizes {
            strings:          heap_sizes & 0x01 != 0,
            guid:             heap_sizes & 0x02 != 0,
            blob:             heap_sizes & 0x04 != 0,
            field:            rows[TABLE_FIELD] > 0xFFFF,
            method:           rows[TABLE_METHOD_DEF] > 0xFFFF,
            type_def_or_ref:  coded(&[TABLE_TYPE_DEF, TABLE_TYPE_REF, TABLE_TYPE_SPEC]),
            has_constant:     coded(&[TABLE_FIELD, TABLE_PARAM, TABLE_PROPERTY]),
            resolution_scope: coded(&[TABLE_MODULE, TABLE_MODULE_REF, TABLE_ASSEMBLY_REF, TABLE_TYPE_REF]),
        }
    }

    /// Byte size of one row, for the tables this module knows.
    pub fn row_size(&self, table: usize) -> Option<usize> {
        let w = |wide: bool| if wide { 4 } else { 2 };
        let size = match table {
            TABLE_MODULE       => 2 + w(self.strings) + 3 * w(self.guid),
            TABLE_TYPE_REF     => w(self.resolution_scope) + 2 * w(self.strings),
            TABLE_TYPE_DEF     => 4 + 2 * w(self.strings) + w(self.type_def_or_ref) + w(self.field) + w(self.method),
            TABLE_FIELD        => 2 + w(self.strings) + w(self.blob),
            TABLE_CONSTANT     => 2 + w(self.has_constant) + w(self.blob),
            TABLE_ASSEMBLY     => 16 + w(self.blob) + 2 * w(self.strings),
            TABLE_ASSEMBLY_REF => 12 + 2 * w(self.blob) + 2 * w(self.strings),
            _ => return None,
        };
        Some(size)
    }
}

fn write_index(bb: &mut ByteBufferMut, value: u32, wide: bool) {
    if wide {
        bb.write_u32(value);
    } else {
        bb.write_u16(value as u16);
    }
}

struct StringHeap {
    data:    Vec<u8>,
    offsets: HashMap<String, u32>,
}

impl StringHeap {
    fn new() -> StringHeap {
        StringHeap {
            data:    vec![0],
            offsets: HashMap::new(),
        }
    }

    fn push(&mut self, value: &str) -> u32 {
        if value.is_empty() {
            return 0;
        }
        if let Some(&offset) = self.offsets.get(value) {
            return offset;
        }
        let offset = self.data.len() as u32;
        self.data.extend_from_slice(value.as_bytes());
        self.data.push(0);
        self.offsets.insert(value.to_string(), offset);
        offset
    }
}

struct BlobHeap {
    bb:      ByteBufferMut,
    offsets: HashMap<Vec<u8>, u32>,
}

impl BlobHeap {
    fn new() -> BlobHeap {
        let mut bb = ByteBufferMut::new();
        bb.write_byte(0);
        BlobHeap {
            bb,
            offsets: HashMap::new(),
        }
    }

    fn push(&mut self, blob: &[u8]) -> Result<u32, EnumError> {
        if let Some(&offset) = self.offsets.get(blob) {
            return Ok(offset);
        }
        let offset = self.bb.len() as u32;
        self.bb
            .write_compressed_uint(blob.len() as u32)
            .map_err(|e| EnumError::EncodeError(format!("blob of {} bytes: {:?}", blob.len(), e)))?;
        self.bb.write_bytes(blob);
        self.offsets.insert(blob.to_vec(), offset);
        Ok(offset)
    }
}

/// What goes into the module: one enum type with its literals.
pub(crate) struct ModuleSpec<'a> {
    pub assembly_name: &'a str,
    pub namespace:     Option<&'a str>,
    pub type_name:     &'a str,
    pub storage:       StorageType,
    pub entries:       &'a [EnumEntry],
    pub mvid:          [u8; 16],
}

struct FieldRow {
    flags:     u16,
    name:      u32,
    signature: u32,
}

struct ConstantRow {
    element_type: u8,
    parent:       u32,
    value:        u32,
}

fn padded(mut data: Vec<u8>) -> Vec<u8> {
    while data.len() % 4 != 0 {
        data.push(0);
    }
    data
}

/// Serialize the metadata root with its five streams.
pub(crate) fn build_metadata(module: &ModuleSpec<'_>) -> Result<Vec<u8>, EnumError> {
    let mut strings = StringHeap::new();
    let mut blobs = BlobHeap::new();
    let element_type = module.storage.element_type();

    let module_name = strings.push(&format!("{}.dll", module.assembly_name));
    let enum_name = strings.push("Enum");
    let system = strings.push("System");
    let module_type = strings.push("<Module>");
    let type_name = strings.push(module.type_name);
    let type_namespace = module.namespace.map(|ns| strings.push(ns)).unwrap_or(0);

    let value_signature = blobs.push(&[SIG_FIELD, element_type])?;
    let literal_signature = blobs.push(&[SIG_FIELD, ELEMENT_TYPE_VALUETYPE, (ENUM_TYPE_DEF_ROW << 2) as u8])?;

    let mut fields = vec![FieldRow {
        flags:     FIELD_ENUM_VALUE,
        name:      strings.push("value__"),
        signature: value_signature,
    }];
    let mut constants = Vec::with_capacity(module.entries.len());
    for entry in module.entries {
        fields.push(FieldRow {
            flags:     FIELD_LITERAL,
            name:      strings.push(entry.name()),
            signature: literal_signature,
        });
        constants.push(ConstantRow {
            element_type,
            parent: coded_index(fields.len() as u32, HAS_CONSTANT_FIELD, 2),
            value:  blobs.push(&module.storage.encode_constant(entry.value()))?,
        });
    }

    let assembly_name = strings.push(module.assembly_name);
    let mscorlib = strings.push("mscorlib");
    let mscorlib_token = blobs.push(&MSCORLIB_PUBLIC_KEY_TOKEN)?;

    let mut rows = [0u32; 64];
    rows[TABLE_MODULE] = 1;
    rows[TABLE_TYPE_REF] = 1;
    rows[TABLE_TYPE_DEF] = 2;
    rows[TABLE_FIELD] = fields.len() as u32;
    rows[TABLE_CONSTANT] = constants.len() as u32;
    rows[TABLE_ASSEMBLY] = 1;
    rows[TABLE_ASSEMBLY_REF] = 1;

    let strings_data = padded(strings.data);
    let blob_data = padded(blobs.bb.data());
    let mut heap_sizes = 0u8;
    if strings_data.len() > 0xFFFF {
        heap_sizes |= 0x01;
    }
    if blob_data.len() > 0xFFFF {
        heap_sizes |= 0x04;
    }
    let sizes = IndexSizes::new(heap_sizes, &rows);

    let mut bb = ByteBufferMut::new();
    bb.write_u32(0);
    bb.write_byte(2);
    bb.write_byte(0);
    bb.write_byte(heap_sizes);
    bb.write_byte(1);
    bb.write_u64(EMITTED_TABLES.iter().fold(0u64, |mask, &t| mask | 1 << t));
    bb.write_u64(SORTED_TABLES);
    for &table in &EMITTED_TABLES {
        bb.write_u32(rows[table]);
    }

    // Module
    bb.write_u16(0);
    write_index(&mut bb, module_name, sizes.strings);
    write_index(&mut bb, 1, sizes.guid);
    write_index(&mut bb, 0, sizes.guid);
    write_index(&mut bb, 0, sizes.guid);

    // TypeRef: [mscorlib]System.Enum
    write_index(
        &mut bb,
        coded_index(MSCORLIB_ASSEMBLY_REF_ROW, RESOLUTION_SCOPE_ASSEMBLY_REF, 2),
        sizes.resolution_scope,
    );
    write_index(&mut bb, enum_name, sizes.strings);
    write_index(&mut bb, system, sizes.strings);

    // TypeDef: <Module>, then the enum owning every field
    bb.write_u32(0);
    write_index(&mut bb, module_type, sizes.strings);
    write_index(&mut bb, 0, sizes.strings);
    write_index(&mut bb, 0, sizes.type_def_or_ref);
    write_index(&mut bb, 1, sizes.field);
    write_index(&mut bb, 1, sizes.method);

    bb.write_u32(TYPE_PUBLIC_SEALED);
    write_index(&mut bb, type_name, sizes.strings);
    write_index(&mut bb, type_namespace, sizes.strings);
    write_index(
        &mut bb,
        coded_index(SYSTEM_ENUM_TYPE_REF_ROW, TYPE_DEF_OR_REF_TYPE_REF, 2),
        sizes.type_def_or_ref,
    );
    write_index(&mut bb, 1, sizes.field);
    write_index(&mut bb, 1, sizes.method);

    for field in &fields {
        bb.write_u16(field.flags);
        write_index(&mut bb, field.name, sizes.strings);
        write_index(&mut bb, field.signature, sizes.blob);
    }

    // Constant rows are sorted by parent, which follows field order.
    for constant in &constants {
        bb.write_byte(constant.element_type);
        bb.write_byte(0);
        write_index(&mut bb, constant.parent, sizes.has_constant);
        write_index(&mut bb, constant.value, sizes.blob);
    }

    // Assembly
    bb.write_u32(HASH_ALGORITHM_SHA1);
    bb.write_zeros(8);
    bb.write_u32(0);
    write_index(&mut bb, 0, sizes.blob);
    write_index(&mut bb, assembly_name, sizes.strings);
    write_index(&mut bb, 0, sizes.strings);

    // AssemblyRef: mscorlib 4.0.0.0
    bb.write_u16(4);
    bb.write_zeros(6);
    bb.write_u32(0);
    write_index(&mut bb, mscorlib_token, sizes.blob);
    write_index(&mut bb, mscorlib, sizes.strings);
    write_index(&mut bb, 0, sizes.strings);
    write_index(&mut bb, 0, sizes.blob);
    bb.align(4);

    let streams: [(&str, Vec<u8>); 5] = [
        ("#~", bb.data()),
        ("#Strings", strings_data),
        ("#US", vec![0; 4]),
        ("#GUID", module.mvid.to_vec()),
        ("#Blob", blob_data),
    ];
    Ok(write_root(&streams))
}

fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

fn write_root(streams: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let version_len = padded_len(METADATA_VERSION.len() + 1);
    let header_len = 16
        + version_len
        + 4
        + streams.iter().map(|(name, _)| 8 + padded_len(name.len() + 1)).sum::<usize>();

    let mut bb = ByteBufferMut::new();
    bb.write_u32(METADATA_SIGNATURE);
    bb.write_u16(1);
    bb.write_u16(1);
    bb.write_u32(0);
    bb.write_u32(version_len as u32);
    bb.write_bytes(METADATA_VERSION.as_bytes());
    bb.write_zeros(version_len - METADATA_VERSION.len());
    bb.write_u16(0);
    bb.write_u16(streams.len() as u16);

    let mut offset = header_len;
    for (name, data) in streams {
        bb.write_u32(offset as u32);
        bb.write_u32(data.len() as u32);
        bb.write_string(name);
        bb.align(4);
        offset += data.len();
    }
    for (_, data) in streams {
        bb.write_bytes(data);
    }
    bb.data()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_heap_deduplicates() {
        let mut heap = StringHeap::new();
        let a = heap.push("Enum");
        let b = heap.push("System");
        assert_eq!(a, 1);
        assert_eq!(b, 6);
        assert_eq!(heap.push("Enum"), a);
        assert_eq!(heap.push(""), 0);
        assert_eq!(heap.data, b"\0Enum\0System\0");
    }

    #[test]
    fn blob_heap_prefixes_lengths() {
        let mut heap = BlobHeap::new();
        assert_eq!(heap.push(&[SIG_FIELD, 0x08]).unwrap(), 1);
        assert_eq!(heap.push(&[1, 2, 3]).unwrap(), 4);
        assert_eq!(heap.push(&[SIG_FIELD, 0x08]).unwrap(), 1);
        assert_eq!(heap.bb.data(), vec![0, 2, SIG_FIELD, 0x08, 3, 1, 2, 3]);
    }

    #[test]
    fn narrow_rows_for_small_modules() {
        let mut rows = [0u32; 64];
        rows[TABLE_FIELD] = 3;
        let sizes = IndexSizes::new(0, &rows);
        assert_eq!(sizes.row_size(TABLE_MODULE), Some(10));
        assert_eq!(sizes.row_size(TABLE_TYPE_REF), Some(6));
        assert_eq!(sizes.row_size(TABLE_TYPE_DEF), Some(14));
        assert_eq!(sizes.row_size(TABLE_FIELD), Some(6));
        assert_eq!(sizes.row_size(TABLE_CONSTANT), Some(6));
        assert_eq!(sizes.row_size(TABLE_ASSEMBLY), Some(22));
        assert_eq!(sizes.row_size(TABLE_ASSEMBLY_REF), Some(20));
        assert_eq!(sizes.row_size(TABLE_METHOD_DEF), None);
    }

    #[test]
    fn many_fields_widen_coded_indices() {
        let mut rows = [0u32; 64];
        rows[TABLE_FIELD] = 1 << 14;
        let sizes = IndexSizes::new(0x01, &rows);
        assert!(sizes.strings);
        assert!(sizes.has_constant);
        assert!(!sizes.field);
        assert_eq!(sizes.row_size(TABLE_CONSTANT), Some(8));
    }
}
