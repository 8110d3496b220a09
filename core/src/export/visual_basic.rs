use crate::{
    code_builder::CodeBuilder,
    definition::EnumDefinition,
    error::EnumError,
    export::{
        check_namespace, check_values, needs_separator, write_header, write_summary, ExportOptions,
        HeaderMode, Language, GENERATOR_NAME, GENERATOR_VERSION,
    },
};

/// Render `definition` as a Visual Basic source file.
pub fn export_visual_basic(definition: &EnumDefinition, options: &ExportOptions) -> Result<String, EnumError> {
    let namespace = check_namespace(options.namespace.as_deref())?;
    check_values(definition, options.storage)?;

    let mut builder = options.code_builder();
    if options.header == HeaderMode::Default {
        write_header(&mut builder, "'");
        builder.write_empty_line();
    }
    builder.write_line("Imports System.CodeDom.Compiler");
    builder.write_empty_line();

    match namespace {
        Some(namespace) => {
            builder.write_line(&format!("Namespace {}", namespace));
            builder.begin_indent();
            write_enum(&mut builder, definition, options);
            builder.end_indent();
            builder.write_line("End Namespace");
        }
        None => write_enum(&mut builder, definition, options),
    }

    Ok(builder.build())
}

fn write_enum(builder: &mut CodeBuilder, definition: &EnumDefinition, options: &ExportOptions) {
    if let Some(doc) = definition.documentation() {
        write_summary(builder, "'''", doc, 0);
    }
    builder.write_line(&format!(
        "<GeneratedCode(\"{}\", \"{}\")>",
        GENERATOR_NAME, GENERATOR_VERSION
    ));
    match options.storage.keyword(Language::VisualBasic) {
        Some(keyword) => builder.write_line(&format!("Public Enum {} As {}", definition.identifier(), keyword)),
        None => builder.write_line(&format!("Public Enum {}", definition.identifier())),
    }

    builder.begin_indent();
    let mut previous = None;
    for entry in definition.entries() {
        if needs_separator(previous, entry) {
            builder.write_empty_line();
        }
        if let Some(doc) = entry.documentation() {
            write_summary(builder, "'''", doc, 0);
        }
        builder.write_line(&format!("{} = {}", entry.name(), entry.value()));
        previous = Some(entry);
    }
    builder.end_indent();
    builder.write_line("End Enum");
}
