use enumgen_core::{
    builder::EnumBuilder,
    definition::EnumDefinition,
    error::EnumError,
    export::{
        class_library::{describe, ConstantDescription},
        export_class_library, ExportOptions,
    },
    storage::{StorageType, ALL_STORAGE_TYPES},
};

fn build(entries: &[(&str, i64)]) -> EnumDefinition {
    let mut builder = EnumBuilder::new("TestEnum").unwrap();
    for (name, value) in entries {
        builder.push_entry(name, *value, None).unwrap();
    }
    builder.build().unwrap()
}

fn constants(entries: &[(&str, i64)]) -> Vec<ConstantDescription> {
    entries
        .iter()
        .map(|(name, value)| ConstantDescription {
            name:  name.to_string(),
            value: *value,
        })
        .collect()
}

#[test]
fn invalid_namespace_is_rejected() {
    let options = ExportOptions::default()
        .with_namespace("0Test")
        .with_assembly_name("Test");
    let err = export_class_library(&build(&[("A", 1)]), &options).unwrap_err();
    assert!(matches!(err, EnumError::InvalidNamespace(_)));
}

#[test]
fn invalid_assembly_name_is_rejected() {
    let options = ExportOptions::default()
        .with_namespace("Test")
        .with_assembly_name("0Test");
    let err = export_class_library(&build(&[("A", 1)]), &options).unwrap_err();
    assert!(matches!(err, EnumError::InvalidAssemblyName(name) if name == "0Test"));
}

#[test]
fn out_of_bounds_value_is_rejected() {
    let options = ExportOptions::default()
        .with_storage(StorageType::Unsigned8Bit)
        .with_assembly_name("Test");
    let err = export_class_library(&build(&[("A", -1)]), &options).unwrap_err();
    assert!(matches!(err, EnumError::OutOfBoundsValue { value: -1, .. }));
}

#[test]
fn basic_enum_is_exported() {
    let entries = [("A", 1), ("B", 2)];
    let image = export_class_library(&build(&entries), &ExportOptions::default().with_assembly_name("Test")).unwrap();
    let description = describe(&image).unwrap();

    assert_eq!(description.assembly_name, "Test");
    assert_eq!(description.module_name, "Test.dll");
    assert_eq!(description.types.len(), 1);
    let enum_type = &description.types[0];
    assert_eq!(enum_type.full_name(), "TestEnum");
    assert_eq!(enum_type.namespace, None);
    assert_eq!(enum_type.storage, StorageType::Signed32Bit);
    assert_eq!(enum_type.constants, constants(&entries));
}

#[test]
fn assembly_name_defaults_to_the_identifier() {
    let image = export_class_library(&build(&[("A", 1)]), &ExportOptions::default()).unwrap();
    let description = describe(&image).unwrap();
    assert_eq!(description.assembly_name, "TestEnum");
    assert_eq!(description.module_name, "TestEnum.dll");
}

#[test]
fn namespace_is_exported() {
    let options = ExportOptions::default()
        .with_assembly_name("Test")
        .with_namespace("A.B.C");
    let image = export_class_library(&build(&[("A", 1), ("B", 2)]), &options).unwrap();
    let description = describe(&image).unwrap();
    assert_eq!(description.types[0].full_name(), "A.B.C.TestEnum");
    assert_eq!(description.types[0].namespace.as_deref(), Some("A.B.C"));
}

#[test]
fn storage_type_is_exported() {
    let entries = [("A", 1), ("B", -1)];
    let options = ExportOptions::default()
        .with_assembly_name("Test")
        .with_storage(StorageType::Signed8Bit);
    let image = export_class_library(&build(&entries), &options).unwrap();
    let description = describe(&image).unwrap();
    assert_eq!(description.types[0].storage, StorageType::Signed8Bit);
    assert_eq!(description.types[0].constants, constants(&entries));
}

#[test]
fn every_storage_type_round_trips_its_bounds() {
    for storage in ALL_STORAGE_TYPES.iter().skip(1).copied() {
        let entries = [("Min", storage.min_value()), ("Max", storage.max_value())];
        let options = ExportOptions::default().with_storage(storage);
        let image = export_class_library(&build(&entries), &options).unwrap();
        let description = describe(&image).unwrap();
        assert_eq!(description.types[0].storage, storage);
        assert_eq!(description.types[0].constants, constants(&entries), "{}", storage);
    }
}

#[test]
fn export_is_deterministic() {
    let definition = build(&[("A", 1), ("B", 2)]);
    let options = ExportOptions::default().with_assembly_name("Test");
    let first = export_class_library(&definition, &options).unwrap();
    let second = export_class_library(&definition, &options).unwrap();
    assert_eq!(first, second);
    assert_eq!(describe(&first).unwrap().mvid, describe(&second).unwrap().mvid);
}

#[test]
fn different_content_gets_a_different_mvid() {
    let options = ExportOptions::default().with_assembly_name("Test");
    let first = export_class_library(&build(&[("A", 1)]), &options).unwrap();
    let second = export_class_library(&build(&[("A", 2)]), &options).unwrap();
    assert_ne!(describe(&first).unwrap().mvid, describe(&second).unwrap().mvid);
}

#[test]
fn image_has_the_expected_envelope() {
    let image = export_class_library(&build(&[("A", 1)]), &ExportOptions::default()).unwrap();
    assert_eq!(&image[..2], b"MZ");
    assert_eq!(u32::from_le_bytes([image[0x3C], image[0x3D], image[0x3E], image[0x3F]]), 0x80);
    assert_eq!(&image[0x80..0x84], b"PE\0\0");
    // COFF timestamp
    assert_eq!(&image[0x88..0x8C], &[0, 0, 0, 0]);
    assert_eq!(image.len() % 0x200, 0);
}

#[test]
fn many_entries_fit() {
    let names: Vec<String> = (0..2000).map(|i| format!("Entry{}", i)).collect();
    let mut builder = EnumBuilder::new("Large").unwrap();
    for (i, name) in names.iter().enumerate() {
        builder.push_entry(name, i as i64 * 3, None).unwrap();
    }
    let definition = builder.build().unwrap();

    let image = export_class_library(&definition, &ExportOptions::default()).unwrap();
    let description = describe(&image).unwrap();
    assert_eq!(description.types[0].constants.len(), 2000);
    assert_eq!(description.types[0].constants[1999].name, "Entry1999");
    assert_eq!(description.types[0].constants[1999].value, 5997);
}

#[test]
fn truncated_images_are_decode_errors() {
    let image = export_class_library(&build(&[("A", 1)]), &ExportOptions::default()).unwrap();
    for len in [0, 0x40, 0x100, 0x210, 0x260] {
        assert!(matches!(describe(&image[..len]), Err(EnumError::DecodeError(_))), "len {}", len);
    }
}

/// Byte offset of the enum's TypeDef row: public sealed flags, then name,
/// namespace and extends (2-byte indexes each) ahead of the field list.
fn enum_type_def_row(image: &[u8]) -> usize {
    image
        .windows(4)
        .position(|w| w == 0x0000_0101u32.to_le_bytes())
        .unwrap()
}

#[test]
fn zero_field_list_is_a_decode_error() {
    let mut image = export_class_library(&build(&[("A", 1), ("B", 2)]), &ExportOptions::default()).unwrap();
    let field_list = enum_type_def_row(&image) + 10;
    assert_eq!(&image[field_list..field_list + 2], &[1, 0]);

    image[field_list] = 0;
    assert!(matches!(describe(&image), Err(EnumError::DecodeError(_))));
}

#[test]
fn field_list_past_the_field_table_is_a_decode_error() {
    let mut image = export_class_library(&build(&[("A", 1), ("B", 2)]), &ExportOptions::default()).unwrap();
    let field_list = enum_type_def_row(&image) + 10;

    image[field_list] = 0x40;
    assert!(matches!(describe(&image), Err(EnumError::DecodeError(_))));
}
