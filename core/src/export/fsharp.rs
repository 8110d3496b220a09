use crate::{
    code_builder::{CodeBuilder, IndentMode},
    definition::EnumDefinition,
    error::EnumError,
    export::{
        check_namespace, check_values, needs_separator, write_header, write_summary, ExportOptions,
        HeaderMode, Language, GENERATOR_NAME, GENERATOR_VERSION,
    },
};

/// F# requires every type to live in a namespace or module.
pub const DEFAULT_NAMESPACE: &str = "Generated";

/// Render `definition` as an F# source file.
pub fn export_fsharp(definition: &EnumDefinition, options: &ExportOptions) -> Result<String, EnumError> {
    let namespace = check_namespace(options.namespace.as_deref())?.unwrap_or(DEFAULT_NAMESPACE);
    check_values(definition, options.storage)?;

    // Tabs are not allowed in offside-significant F# code.
    let mut builder = CodeBuilder::new(IndentMode::Spaces, options.indent_size, options.newline);
    if options.header == HeaderMode::Default {
        write_header(&mut builder, "//");
        builder.write_empty_line();
    }
    builder.write_line(&format!("namespace {}", namespace));
    builder.write_empty_line();
    builder.write_line("open System.CodeDom.Compiler");
    builder.write_empty_line();

    if let Some(doc) = definition.documentation() {
        write_summary(&mut builder, "///", doc, 0);
    }
    builder.write_line(&format!(
        "[<GeneratedCode(\"{}\", \"{}\")>]",
        GENERATOR_NAME, GENERATOR_VERSION
    ));
    builder.write_line(&format!("type {} =", definition.identifier()));

    let suffix = options.storage.keyword(Language::FSharp).unwrap_or("");
    let mut previous = None;
    for entry in definition.entries() {
        if needs_separator(previous, entry) {
            builder.write_empty_line();
        }
        if let Some(doc) = entry.documentation() {
            write_summary(&mut builder, "///", doc, 1);
        }
        builder.write_line_with(&format!("| {} = {}{}", entry.name(), entry.value(), suffix), "", 1);
        previous = Some(entry);
    }

    Ok(builder.build())
}
