//! Identifier and namespace validation, and best-effort identifier creation
//! from free-form text.
//!
//! The accepted character set follows the .NET language rules: an identifier
//! starts with a letter or underscore and continues with characters from the
//! Unicode categories Lu, Ll, Lt, Lm, Lo, Nl, Mn, Mc, Nd, Pc and Cf.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IDENTIFIER: Regex =
        Regex::new(r"^[\p{L}_][\p{L}\p{Nl}\p{Mn}\p{Mc}\p{Nd}\p{Pc}\p{Cf}]*$").unwrap();
    static ref IDENTIFIER_START: Regex = Regex::new(r"^[\p{L}_]$").unwrap();
    static ref IDENTIFIER_PART: Regex =
        Regex::new(r"^[\p{L}\p{Nl}\p{Mn}\p{Mc}\p{Nd}\p{Pc}\p{Cf}]$").unwrap();
}

/// Returns `true` if `identifier` can be used as a type or member name.
pub fn validate(identifier: &str) -> bool {
    IDENTIFIER.is_match(identifier)
}

/// Returns `true` if `namespace` is a dot-separated list of valid identifiers.
pub fn validate_namespace(namespace: &str) -> bool {
    !namespace.is_empty() && namespace.split('.').all(validate)
}

fn is_start_char(c: char) -> bool {
    let mut buf = [0u8; 4];
    IDENTIFIER_START.is_match(c.encode_utf8(&mut buf))
}

fn is_part_char(c: char) -> bool {
    let mut buf = [0u8; 4];
    IDENTIFIER_PART.is_match(c.encode_utf8(&mut buf))
}

/// Splits on everything that cannot appear in an identifier (plus `_`) and on
/// lowercase-to-uppercase transitions.
fn segments(raw: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in raw.chars() {
        if c == '_' || !is_part_char(c) {
            if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }

        if prev_lower && c.is_uppercase() && !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase();
        current.push(c);
    }

    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

/// Convert free-form text into a PascalCase identifier.
///
/// `"test identifier-with/separators"` becomes `"TestIdentifierWithSeparators"`
/// and `"0 - Test"` becomes `"_0Test"`. Returns `None` when nothing usable is
/// left after dropping the separators.
pub fn try_create_identifier(raw: &str) -> Option<String> {
    let mut identifier: String = segments(raw).iter().map(|s| capitalize(s)).collect();

    match identifier.chars().next() {
        None => return None,
        Some(first) if !is_start_char(first) => identifier.insert(0, '_'),
        Some(_) => {}
    }

    if validate(&identifier) {
        Some(identifier)
    } else {
        None
    }
}
