use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LINE_BREAKS: Regex = Regex::new(r"[\r\n]+").unwrap();
}

/// Json-style quoting, used in diagnostics.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

/// Documentation blocks are single-line: every run of line breaks becomes one space.
pub fn collapse_newlines(text: &str) -> String {
    LINE_BREAKS.replace_all(text, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_any_line_break_run() {
        assert_eq!(collapse_newlines("a\nb"), "a b");
        assert_eq!(collapse_newlines("a\r\n\r\nb\rc"), "a b c");
        assert_eq!(collapse_newlines("plain"), "plain");
    }

    #[test]
    fn quotes_like_json() {
        assert_eq!(quote("name"), "\"name\"");
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
    }
}
