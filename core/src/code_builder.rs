//! Line-oriented text emitter with configurable indentation and newlines.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndentMode {
    #[default]
    Spaces,
    Tabs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewlineMode {
    /// `\n`
    #[default]
    Unix,
    /// `\r\n`
    Windows,
}

impl NewlineMode {
    pub fn as_str(self) -> &'static str {
        match self {
            NewlineMode::Unix    => "\n",
            NewlineMode::Windows => "\r\n",
        }
    }
}

pub const DEFAULT_INDENT_SIZE: usize = 4;

/// Accumulates lines at a current indentation depth and joins them with one
/// newline style in [`CodeBuilder::build`].
///
/// `begin_indent`/`end_indent` calls must balance; the depth never goes
/// below zero.
pub struct CodeBuilder {
    indent_unit: String,
    newline:     NewlineMode,
    depth:       usize,
    lines:       Vec<String>,
}

impl CodeBuilder {
    pub fn new(indent_mode: IndentMode, space_indent_size: usize, newline: NewlineMode) -> Self {
        let indent_unit = match indent_mode {
            IndentMode::Spaces => " ".repeat(space_indent_size),
            IndentMode::Tabs   => "\t".to_string(),
        };
        CodeBuilder {
            indent_unit,
            newline,
            depth: 0,
            lines: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Write `text` at the current depth.
    pub fn write_line(&mut self, text: &str) {
        self.write_line_with(text, "", 0);
    }

    /// Write `text` as `prefix`, then the indentation for `depth + additional_indent`,
    /// then the text itself.
    pub fn write_line_with(&mut self, text: &str, prefix: &str, additional_indent: usize) {
        let indent = self.indent_unit.repeat(self.depth + additional_indent);
        self.lines.push(format!("{}{}{}", prefix, indent, text));
    }

    /// Write a line without any content (and without trailing indentation).
    pub fn write_empty_line(&mut self) {
        self.lines.push(String::new());
    }

    pub fn begin_indent(&mut self) {
        self.depth += 1;
    }

    pub fn end_indent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Join every line, each terminated by the configured newline.
    pub fn build(&self) -> String {
        let newline = self.newline.as_str();
        let mut out = String::with_capacity(self.lines.iter().map(|l| l.len() + 2).sum());
        for line in &self.lines {
            out.push_str(line);
            out.push_str(newline);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indents_with_spaces() {
        let mut builder = CodeBuilder::new(IndentMode::Spaces, 2, NewlineMode::Unix);
        builder.write_line("a");
        builder.begin_indent();
        builder.write_line("b");
        builder.begin_indent();
        builder.write_line("c");
        builder.end_indent();
        builder.end_indent();
        builder.write_line("d");
        assert_eq!(builder.build(), "a\n  b\n    c\nd\n");
    }

    #[test]
    fn indents_with_tabs_and_windows_newlines() {
        let mut builder = CodeBuilder::new(IndentMode::Tabs, 4, NewlineMode::Windows);
        builder.begin_indent();
        builder.write_line("x");
        builder.write_empty_line();
        builder.write_line("y");
        assert_eq!(builder.build(), "\tx\r\n\r\n\ty\r\n");
    }

    #[test]
    fn prefix_goes_before_indentation() {
        let mut builder = CodeBuilder::new(IndentMode::Spaces, 4, NewlineMode::Unix);
        builder.write_line_with("<auto-generated>", "// ", 0);
        builder.write_line_with("Generated by: tool", "// ", 1);
        assert_eq!(builder.build(), "// <auto-generated>\n//     Generated by: tool\n");
    }

    #[test]
    fn end_indent_saturates() {
        let mut builder = CodeBuilder::new(IndentMode::Spaces, 4, NewlineMode::Unix);
        builder.end_indent();
        assert_eq!(builder.depth(), 0);
        builder.write_line("a");
        assert_eq!(builder.build(), "a\n");
    }
}
