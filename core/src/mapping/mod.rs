//! Build an [`EnumDefinition`] out of a json document.
//!
//! A collection path selects the candidate entry nodes; per candidate the
//! name path (required), value path and comment path (both optional) are
//! evaluated relative to that node. Problems with a single candidate are
//! recovered locally (skip it, fall back to sequential numbering, suffix a
//! colliding name). Everything else aborts the mapping with
//! [`EnumError::MappingFailure`] wrapping the cause.

pub mod path;

use serde_json::Value;
use tracing::{debug, error, trace, warn};

use crate::{
    builder::EnumBuilder,
    definition::EnumDefinition,
    error::EnumError,
    identifier::try_create_identifier,
    utils::quote,
};

pub use path::{JsonPath, PathQuery};

pub const DEFAULT_COLLECTION_PATH: &str = "[*]";
pub const DEFAULT_ENTRY_NAME_PATH: &str = "name";

/// Paths describing where entries live in the input document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingContext {
    pub collection_path:    String,
    pub entry_name_path:    String,
    pub entry_value_path:   Option<String>,
    pub entry_comment_path: Option<String>,
}

impl Default for MappingContext {
    fn default() -> Self {
        MappingContext::new(DEFAULT_COLLECTION_PATH, DEFAULT_ENTRY_NAME_PATH)
    }
}

impl MappingContext {
    pub fn new(collection_path: &str, entry_name_path: &str) -> Self {
        MappingContext {
            collection_path:    collection_path.to_string(),
            entry_name_path:    entry_name_path.to_string(),
            entry_value_path:   None,
            entry_comment_path: None,
        }
    }

    pub fn with_value_path(mut self, path: &str) -> Self {
        self.entry_value_path = Some(path.to_string());
        self
    }

    pub fn with_comment_path(mut self, path: &str) -> Self {
        self.entry_comment_path = Some(path.to_string());
        self
    }
}

struct CompiledPaths<Q> {
    collection: Q,
    name:       Q,
    value:      Option<Q>,
    comment:    Option<Q>,
}

fn compile_optional<Q: PathQuery>(path: Option<&String>) -> Result<Option<Q>, EnumError> {
    match path {
        Some(p) if !p.is_empty() => Q::compile(p).map(Some),
        _ => Ok(None),
    }
}

impl<Q: PathQuery> CompiledPaths<Q> {
    fn compile(context: &MappingContext) -> Result<Self, EnumError> {
        Ok(CompiledPaths {
            collection: Q::compile(&context.collection_path)?,
            name:       Q::compile(&context.entry_name_path)?,
            value:      compile_optional(context.entry_value_path.as_ref())?,
            comment:    compile_optional(context.entry_comment_path.as_ref())?,
        })
    }
}

/// Parse `json_text` and map it. Unparsable text is reported as
/// [`EnumError::InputFormat`]; any later failure as [`EnumError::MappingFailure`].
pub fn map_enum(
    context: &MappingContext,
    json_text: &str,
    enum_name: &str,
    enum_comment: Option<&str>,
) -> Result<EnumDefinition, EnumError> {
    let document: Value = serde_json::from_str(json_text).map_err(EnumError::InputFormat)?;
    map_document(context, &document, enum_name, enum_comment)
}

/// Map an already parsed document using the bundled [`JsonPath`] evaluator.
pub fn map_document(
    context: &MappingContext,
    document: &Value,
    enum_name: &str,
    enum_comment: Option<&str>,
) -> Result<EnumDefinition, EnumError> {
    map_document_with::<JsonPath>(context, document, enum_name, enum_comment)
}

/// Map an already parsed document with a caller-chosen path language.
pub fn map_document_with<Q: PathQuery>(
    context: &MappingContext,
    document: &Value,
    enum_name: &str,
    enum_comment: Option<&str>,
) -> Result<EnumDefinition, EnumError> {
    map_inner::<Q>(context, document, enum_name, enum_comment)
        .map_err(|e| EnumError::MappingFailure(Box::new(e)))
}

fn map_inner<Q: PathQuery>(
    context: &MappingContext,
    document: &Value,
    enum_name: &str,
    enum_comment: Option<&str>,
) -> Result<EnumDefinition, EnumError> {
    let mut builder = EnumBuilder::new(enum_name)?.with_comment(enum_comment.map(str::to_string));
    let paths = CompiledPaths::<Q>::compile(context)?;

    let candidates = paths.collection.select_all(document);
    if candidates.is_empty() {
        warn!("No nodes found at path: {}", quote(paths.collection.expression()));
    }
    for candidate in candidates {
        map_entry(&paths, &mut builder, candidate)?;
    }

    debug!("Enum {} with {} entries mapped", quote(enum_name), builder.entry_count());
    builder.build()
}

fn map_entry<Q: PathQuery>(
    paths: &CompiledPaths<Q>,
    builder: &mut EnumBuilder,
    node: &Value,
) -> Result<(), EnumError> {
    let raw_name = match paths.name.select_one(node)?.and_then(Value::as_str) {
        Some(name) => name,
        None => {
            trace!("Skipping entry without a string name at path: {}", quote(paths.name.expression()));
            return Ok(());
        }
    };
    trace!("Entry name found: {}", quote(raw_name));

    let identifier = match try_create_identifier(raw_name) {
        Some(id) => id,
        None => {
            error!("Unable to convert name {} into a valid identifier", quote(raw_name));
            return Ok(());
        }
    };
    let name = disambiguate(builder, &identifier);
    debug!("Parsed entry-name: {}", name);

    let value = match &paths.value {
        Some(path) => match path.select_one(node)?.and_then(Value::as_i64) {
            Some(value) => value,
            None => {
                trace!("No integer value found at {}, using count as value", quote(path.expression()));
                builder.entry_count() as i64
            }
        },
        None => builder.entry_count() as i64,
    };
    debug!("Parsed entry-value: {}", value);

    let comment = match &paths.comment {
        Some(path) => path.select_one(node)?.and_then(Value::as_str).map(str::to_string),
        None => None,
    };
    if let Some(comment) = &comment {
        debug!("Parsed entry-comment: {}", quote(comment));
    }

    builder.push_entry(&name, value, comment)
}

/// First of `base`, `base_1`, `base_2`, ... that the builder does not hold yet.
fn disambiguate(builder: &EnumBuilder, base: &str) -> String {
    if !builder.has_entry(base) {
        return base.to_string();
    }

    let mut suffix = 1u64;
    loop {
        let candidate = format!("{}_{}", base, suffix);
        if !builder.has_entry(&candidate) {
            return candidate;
        }
        trace!("Duplicate name {}, trying next suffix", quote(&candidate));
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fmt;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<(Level, String)>>>);

    struct MessageVisitor<'a>(&'a mut String);

    impl Visit for MessageVisitor<'_> {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "message" {
                *self.0 = format!("{:?}", value);
            }
        }
    }

    impl<S: Subscriber> Layer<S> for Captured {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut message = String::new();
            event.record(&mut MessageVisitor(&mut message));
            self.0.lock().unwrap().push((*event.metadata().level(), message));
        }
    }

    fn logged_while(f: impl FnOnce()) -> Vec<(Level, String)> {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::registry().with(captured.clone());
        tracing::subscriber::with_default(subscriber, f);
        let events = captured.0.lock().unwrap().clone();
        events
    }

    fn level_of(events: &[(Level, String)], prefix: &str) -> Option<Level> {
        events.iter().find(|(_, m)| m.starts_with(prefix)).map(|(level, _)| *level)
    }

    #[test]
    fn skipped_entries_log_at_their_levels() {
        let document = json!([{ "name": "A" }, { "value": 1 }, { "name": "!!!" }]);
        let events = logged_while(|| {
            let definition = map_document(&MappingContext::default(), &document, "TestEnum", None).unwrap();
            assert_eq!(definition.len(), 1);
        });

        assert_eq!(level_of(&events, "Skipping entry without a string name"), Some(Level::TRACE));
        assert_eq!(level_of(&events, "Unable to convert name"), Some(Level::ERROR));
    }

    #[test]
    fn empty_collection_logs_a_warning() {
        let events = logged_while(|| {
            assert!(map_document(&MappingContext::default(), &json!([]), "TestEnum", None).is_err());
        });
        assert_eq!(level_of(&events, "No nodes found at path"), Some(Level::WARN));
    }

    #[test]
    fn disambiguation_uses_first_free_suffix() {
        let mut builder = EnumBuilder::new("TestEnum").unwrap();
        assert_eq!(disambiguate(&builder, "A"), "A");
        builder.push_entry("A", 0, None).unwrap();
        assert_eq!(disambiguate(&builder, "A"), "A_1");
        builder.push_entry("A_2", 1, None).unwrap();
        assert_eq!(disambiguate(&builder, "A"), "A_1");
        builder.push_entry("A_1", 2, None).unwrap();
        assert_eq!(disambiguate(&builder, "A"), "A_3");
        assert_eq!(disambiguate(&builder, "A_1"), "A_1_1");
    }

    #[test]
    fn empty_optional_paths_are_unconfigured() {
        let context = MappingContext::new("[*]", "name")
            .with_value_path("")
            .with_comment_path("");
        let paths = CompiledPaths::<JsonPath>::compile(&context).unwrap();
        assert!(paths.value.is_none());
        assert!(paths.comment.is_none());
    }
}
