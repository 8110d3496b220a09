use crate::{
    code_builder::CodeBuilder,
    definition::EnumDefinition,
    error::EnumError,
    export::{
        check_namespace, check_values, close_scope, needs_separator, open_scope, write_header,
        write_summary, ExportOptions, HeaderMode, Language, GENERATOR_NAME, GENERATOR_VERSION,
    },
};

/// Render `definition` as a C# source file.
pub fn export_csharp(definition: &EnumDefinition, options: &ExportOptions) -> Result<String, EnumError> {
    let namespace = check_namespace(options.namespace.as_deref())?;
    check_values(definition, options.storage)?;

    let mut builder = options.code_builder();
    if options.header == HeaderMode::Default {
        write_header(&mut builder, "//");
        builder.write_empty_line();
    }
    builder.write_line("using System.CodeDom.Compiler;");
    builder.write_empty_line();

    match namespace {
        Some(namespace) => {
            open_scope(&mut builder, &format!("namespace {}", namespace), options.curly_bracket);
            write_enum(&mut builder, definition, options);
            close_scope(&mut builder);
        }
        None => write_enum(&mut builder, definition, options),
    }

    Ok(builder.build())
}

fn write_enum(builder: &mut CodeBuilder, definition: &EnumDefinition, options: &ExportOptions) {
    if let Some(doc) = definition.documentation() {
        write_summary(builder, "///", doc, 0);
    }
    builder.write_line(&format!(
        "[GeneratedCode(\"{}\", \"{}\")]",
        GENERATOR_NAME, GENERATOR_VERSION
    ));

    let declaration = match options.storage.keyword(Language::CSharp) {
        Some(keyword) => format!("public enum {} : {}", definition.identifier(), keyword),
        None => format!("public enum {}", definition.identifier()),
    };
    open_scope(builder, &declaration, options.curly_bracket);

    let mut previous = None;
    for entry in definition.entries() {
        if needs_separator(previous, entry) {
            builder.write_empty_line();
        }
        if let Some(doc) = entry.documentation() {
            write_summary(builder, "///", doc, 0);
        }
        builder.write_line(&format!("{} = {},", entry.name(), entry.value()));
        previous = Some(entry);
    }

    close_scope(builder);
}
