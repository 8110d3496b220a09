//! ILAsm text for an assembly holding a single enum type.

use crate::{
    definition::EnumDefinition,
    error::EnumError,
    export::{
        check_assembly_name, check_namespace, check_values, close_scope, needs_separator,
        open_scope, write_header, CurlyBracketMode, ExportOptions, HeaderMode, Language,
    },
    storage::StorageType,
    utils::collapse_newlines,
};

pub fn export_cil(definition: &EnumDefinition, options: &ExportOptions) -> Result<String, EnumError> {
    let namespace = check_namespace(options.namespace.as_deref())?;
    let assembly_name = check_assembly_name(options, definition)?;
    check_values(definition, options.storage)?;

    let mut builder = options.code_builder();
    let brackets = options.curly_bracket;
    if options.header == HeaderMode::Default {
        write_header(&mut builder, "//");
        builder.write_empty_line();
    }

    open_scope(&mut builder, ".assembly extern mscorlib", brackets);
    builder.write_line(".publickeytoken = (B7 7A 5C 56 19 34 E0 89 )");
    builder.write_line(".ver 4:0:0:0");
    close_scope(&mut builder);
    open_scope(&mut builder, &format!(".assembly {}", assembly_name), brackets);
    builder.write_line(".ver 0:0:0:0");
    close_scope(&mut builder);
    builder.write_line(&format!(".module {}.dll", assembly_name));
    builder.write_empty_line();

    if let Some(namespace) = namespace {
        open_scope(&mut builder, &format!(".namespace {}", namespace), brackets);
    }

    if let Some(doc) = definition.documentation() {
        builder.write_line(&format!("// {}", collapse_newlines(doc)));
    }
    builder.write_line(&format!(".class public auto ansi sealed {}", definition.identifier()));
    match brackets {
        CurlyBracketMode::NewLine => {
            builder.write_line_with("extends [mscorlib]System.Enum", "", 1);
            builder.write_line("{");
        }
        CurlyBracketMode::SameLine => builder.write_line_with("extends [mscorlib]System.Enum {", "", 1),
    }
    builder.begin_indent();

    // Implicit is written as int32.
    let storage = match options.storage {
        StorageType::Implicit => StorageType::Signed32Bit,
        storage => storage,
    };
    let keyword = storage.keyword(Language::Cil).unwrap_or("int32");
    let full_name = match namespace {
        Some(namespace) => format!("{}.{}", namespace, definition.identifier()),
        None => definition.identifier().to_string(),
    };

    builder.write_line(&format!(".field public specialname rtspecialname {} value__", keyword));
    let mut previous = None;
    for entry in definition.entries() {
        if needs_separator(previous, entry) {
            builder.write_empty_line();
        }
        if let Some(doc) = entry.documentation() {
            builder.write_line(&format!("// {}", collapse_newlines(doc)));
        }
        builder.write_line(&format!(
            ".field public static literal valuetype {} '{}' = {}({})",
            full_name,
            entry.name(),
            keyword,
            entry.value()
        ));
        previous = Some(entry);
    }
    close_scope(&mut builder);

    if namespace.is_some() {
        close_scope(&mut builder);
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::EnumBuilder;

    fn definition() -> EnumDefinition {
        let mut builder = EnumBuilder::new("TestEnum").unwrap();
        builder.push_entry("A", 1, Some("First".to_string())).unwrap();
        builder.push_entry("B", 2, None).unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn declares_assembly_and_literals() {
        let options = ExportOptions {
            header: HeaderMode::None,
            ..ExportOptions::default()
        };
        let output = export_cil(&definition(), &options).unwrap();
        assert!(output.starts_with(".assembly extern mscorlib\n{\n"));
        assert!(output.contains(".assembly TestEnum\n{\n    .ver 0:0:0:0\n}\n.module TestEnum.dll\n"));
        assert!(output.contains(".class public auto ansi sealed TestEnum\n    extends [mscorlib]System.Enum\n{\n"));
        assert!(output.contains("    .field public specialname rtspecialname int32 value__\n"));
        assert!(output.contains("    // First\n    .field public static literal valuetype TestEnum 'A' = int32(1)\n\n"));
        assert!(output.ends_with("'B' = int32(2)\n}\n"));
    }

    #[test]
    fn namespace_and_assembly_name() {
        let options = ExportOptions {
            header:  HeaderMode::None,
            storage: StorageType::Unsigned8Bit,
            ..ExportOptions::default()
        }
        .with_namespace("A.B")
        .with_assembly_name("Lib");
        let output = export_cil(&definition(), &options).unwrap();
        assert!(output.contains(".assembly Lib\n"));
        assert!(output.contains(".module Lib.dll\n"));
        assert!(output.contains(".namespace A.B\n{\n    .class public auto ansi sealed TestEnum\n"));
        assert!(output.contains("valuetype A.B.TestEnum 'A' = uint8(1)"));
    }

    #[test]
    fn rejects_invalid_assembly_name() {
        let options = ExportOptions::default().with_assembly_name("Not valid");
        assert!(matches!(
            export_cil(&definition(), &options),
            Err(EnumError::InvalidAssemblyName(name)) if name == "Not valid"
        ));
    }
}
