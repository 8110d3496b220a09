//! A small JSONPath subset used to locate enum entries in a json document.
//!
//! Supported: an optional leading `$`, `.name` (or a leading bare `name`),
//! `['name']` / `["name"]`, `[n]`, the wildcards `[*]` and `.*`, and recursive
//! descent with `..name` / `..*`. The empty path (or `$` alone) selects the
//! node itself.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::{error::EnumError, utils::quote};

/// Capability the mapping engine needs from a path language: select any
/// number of nodes from a root, or at most one node relative to a node.
pub trait PathQuery: Sized {
    fn compile(expression: &str) -> Result<Self, EnumError>;

    fn expression(&self) -> &str;

    /// Every matching node, in document order.
    fn select_all<'v>(&self, root: &'v Value) -> Vec<&'v Value>;

    /// The single matching node, if any. More than one match is an error.
    fn select_one<'v>(&self, node: &'v Value) -> Result<Option<&'v Value>, EnumError> {
        let mut matches = self.select_all(node);
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            n => Err(EnumError::PathEvaluation {
                path: self.expression().to_string(),
                msg:  format!("expected at most one match but found {}", n),
            }),
        }
    }
}

lazy_static! {
    static ref PATH_TOKEN: Regex =
        Regex::new(r#"\$|\.\.|\.|\[\*\]|\[\d+\]|\['[^']*'\]|\["[^"]*"\]|\*|[^.\[\]\s'"*$]+"#).unwrap();
    static ref INDEX_TOKEN: Regex = Regex::new(r"^\[(\d+)\]$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Child(String),
    Index(usize),
    Wildcard,
    Descendant(String),
    DescendantWildcard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    expression: String,
    segments:   Vec<Segment>,
}

fn path_error(path: &str, msg: String) -> EnumError {
    EnumError::PathEvaluation {
        path: path.to_string(),
        msg,
    }
}

fn tokenize_path(expression: &str) -> Result<Vec<&str>, EnumError> {
    let mut tokens = Vec::new();
    let mut last_end = 0;

    for mat in PATH_TOKEN.find_iter(expression) {
        if mat.start() > last_end {
            let unexpected = &expression[last_end..mat.start()];
            return Err(path_error(expression, format!("unexpected text {}", quote(unexpected))));
        }
        tokens.push(mat.as_str());
        last_end = mat.end();
    }

    if last_end != expression.len() {
        let unexpected = &expression[last_end..];
        return Err(path_error(expression, format!("unexpected text {}", quote(unexpected))));
    }
    Ok(tokens)
}

/// Name carried by a bare or quoted-bracket token.
fn name_of(token: &str) -> Option<String> {
    if let Some(inner) = token
        .strip_prefix("['")
        .and_then(|t| t.strip_suffix("']"))
        .or_else(|| token.strip_prefix("[\"").and_then(|t| t.strip_suffix("\"]")))
    {
        return Some(inner.to_string());
    }
    if !matches!(token, "$" | ".." | "." | "*") && !token.starts_with('[') {
        return Some(token.to_string());
    }
    None
}

fn is_bracket(token: &str) -> bool {
    token.starts_with('[')
}

fn parse_bracket(expression: &str, token: &str) -> Result<Segment, EnumError> {
    if token == "[*]" {
        return Ok(Segment::Wildcard);
    }
    if let Some(caps) = INDEX_TOKEN.captures(token) {
        let index = caps[1]
            .parse::<usize>()
            .map_err(|_| path_error(expression, format!("invalid index {}", quote(token))))?;
        return Ok(Segment::Index(index));
    }
    match name_of(token) {
        Some(name) => Ok(Segment::Child(name)),
        None => Err(path_error(expression, format!("unexpected token {}", quote(token)))),
    }
}

impl JsonPath {
    pub fn parse(expression: &str) -> Result<JsonPath, EnumError> {
        let tokens = tokenize_path(expression)?;
        let mut segments = Vec::new();
        let mut index = 0;

        if tokens.first() == Some(&"$") {
            index += 1;
        } else if let Some(&first) = tokens.first() {
            // A leading bare name or wildcard acts as if preceded by a dot.
            if first == "*" {
                segments.push(Segment::Wildcard);
                index += 1;
            } else if !is_bracket(first) && first != "." && first != ".." {
                if let Some(name) = name_of(first) {
                    segments.push(Segment::Child(name));
                    index += 1;
                }
            }
        }

        while index < tokens.len() {
            let token = tokens[index];
            index += 1;

            match token {
                "." | ".." => {
                    let next = tokens.get(index).copied().ok_or_else(|| {
                        path_error(expression, format!("expected a name after {}", quote(token)))
                    })?;
                    index += 1;

                    let descend = token == "..";
                    let segment = match next {
                        "*" | "[*]" if descend => Segment::DescendantWildcard,
                        "*" => Segment::Wildcard,
                        _ if is_bracket(next) && descend => match parse_bracket(expression, next)? {
                            Segment::Child(name) => Segment::Descendant(name),
                            _ => {
                                return Err(path_error(
                                    expression,
                                    format!("unsupported recursive selector {}", quote(next)),
                                ))
                            }
                        },
                        _ => match name_of(next) {
                            Some(name) if !is_bracket(next) && descend => Segment::Descendant(name),
                            Some(name) if !is_bracket(next) => Segment::Child(name),
                            _ => {
                                return Err(path_error(
                                    expression,
                                    format!("expected a name after {} but found {}", quote(token), quote(next)),
                                ))
                            }
                        },
                    };
                    segments.push(segment);
                }
                _ if is_bracket(token) => segments.push(parse_bracket(expression, token)?),
                _ => {
                    return Err(path_error(expression, format!("unexpected token {}", quote(token))));
                }
            }
        }

        Ok(JsonPath {
            expression: expression.to_string(),
            segments,
        })
    }
}

fn collect_descendants<'v>(node: &'v Value, out: &mut Vec<&'v Value>) {
    match node {
        Value::Array(items) => {
            for item in items {
                out.push(item);
                collect_descendants(item, out);
            }
        }
        Value::Object(map) => {
            for value in map.values() {
                out.push(value);
                collect_descendants(value, out);
            }
        }
        _ => {}
    }
}

fn collect_named<'v>(node: &'v Value, name: &str, out: &mut Vec<&'v Value>) {
    match node {
        Value::Array(items) => {
            for item in items {
                collect_named(item, name, out);
            }
        }
        Value::Object(map) => {
            for (key, value) in map {
                if key == name {
                    out.push(value);
                }
                collect_named(value, name, out);
            }
        }
        _ => {}
    }
}

impl PathQuery for JsonPath {
    fn compile(expression: &str) -> Result<Self, EnumError> {
        JsonPath::parse(expression)
    }

    fn expression(&self) -> &str {
        &self.expression
    }

    fn select_all<'v>(&self, root: &'v Value) -> Vec<&'v Value> {
        let mut current = vec![root];

        for segment in &self.segments {
            let mut next = Vec::new();
            for node in current {
                match segment {
                    Segment::Child(name) => {
                        if let Some(value) = node.as_object().and_then(|map| map.get(name)) {
                            next.push(value);
                        }
                    }
                    Segment::Index(i) => {
                        if let Some(value) = node.as_array().and_then(|items| items.get(*i)) {
                            next.push(value);
                        }
                    }
                    Segment::Wildcard => match node {
                        Value::Array(items) => next.extend(items.iter()),
                        Value::Object(map) => next.extend(map.values()),
                        _ => {}
                    },
                    Segment::Descendant(name) => collect_named(node, name, &mut next),
                    Segment::DescendantWildcard => collect_descendants(node, &mut next),
                }
            }
            current = next;
        }

        current
    }
}
