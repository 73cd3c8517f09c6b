//! Type-safe schema generation for OpenAI structured outputs.
//!
//! Uses the `schemars` crate to generate JSON schemas from Rust types and
//! rewrites them into the subset OpenAI accepts in strict mode.
//!
//! # Example
//!
//! ```rust,ignore
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//! use openai_client::StructuredOutput;
//!
//! #[derive(Deserialize, JsonSchema)]
//! struct Verdict {
//!     decision: String,
//!     rationale: Option<String>,
//! }
//!
//! let schema = Verdict::openai_schema();
//! ```

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Keywords strict mode rejects. schemars emits `format` for integer widths
/// (`uint`, `int32`) and `default` for `#[serde(default)]` fields.
const UNSUPPORTED_KEYWORDS: &[&str] = &["format", "default", "$schema"];

/// Trait for types that can be used as OpenAI structured output.
///
/// Automatically implemented for any type that implements `JsonSchema + DeserializeOwned`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Generate an OpenAI-compatible JSON schema for this type.
    ///
    /// Strict mode requires:
    /// 1. `additionalProperties: false` on all object schemas
    /// 2. ALL properties listed in `required`, even nullable ones
    /// 3. Fully inlined schemas (no `$ref` references)
    fn openai_schema() -> Value {
        let schema = schema_for!(Self);
        strict_schema(serde_json::to_value(schema).unwrap_or_default())
    }

    /// Get the schema name for this type.
    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Rewrite an arbitrary JSON schema (e.g. plain `schemars` output produced
/// elsewhere) into the strict-mode subset.
pub fn strict_schema(mut value: Value) -> Value {
    let definitions = match &mut value {
        Value::Object(map) => map.remove("definitions"),
        _ => None,
    };

    if let Some(defs) = definitions {
        inline_refs(&mut value, &defs);
    }
    flatten_combinators(&mut value);
    make_strict(&mut value);

    value
}

/// Remove the combinators schemars emits that strict mode rejects.
///
/// A documented field referencing another type comes out as a one-element
/// `allOf`, which is merged into the field. Documented enum variants come out
/// as `oneOf`, which becomes a single `enum` when every branch is a bare
/// string constant, and `anyOf` otherwise.
fn flatten_combinators(value: &mut Value) {
    match value {
        Value::Object(map) => {
            while let Some(inner) = take_single_all_of(map) {
                for (key, v) in inner {
                    map.entry(key).or_insert(v);
                }
            }

            if let Some(branches) = map.remove("oneOf") {
                map.insert("anyOf".to_string(), branches);
            }
            if let Some(variants) = string_enum_variants(map) {
                map.remove("anyOf");
                map.insert("type".to_string(), Value::String("string".to_string()));
                map.insert("enum".to_string(), Value::Array(variants));
            }

            for (key, v) in map.iter_mut() {
                match (key.as_str(), v) {
                    ("properties", Value::Object(props)) => {
                        props.values_mut().for_each(flatten_combinators)
                    }
                    (_, v) => flatten_combinators(v),
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(flatten_combinators),
        _ => {}
    }
}

fn take_single_all_of(map: &mut Map<String, Value>) -> Option<Map<String, Value>> {
    let single = matches!(
        map.get("allOf"),
        Some(Value::Array(items)) if items.len() == 1 && items[0].is_object()
    );
    if !single {
        return None;
    }
    match map.remove("allOf") {
        Some(Value::Array(mut items)) => match items.pop() {
            Some(Value::Object(inner)) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

/// Enum values of an `anyOf` whose branches are all plain string enums.
fn string_enum_variants(map: &Map<String, Value>) -> Option<Vec<Value>> {
    const BRANCH_KEYS: &[&str] = &["enum", "type", "description", "title"];

    let branches = map.get("anyOf")?.as_array()?;
    if branches.is_empty() {
        return None;
    }

    let mut variants = Vec::new();
    for branch in branches {
        let branch = branch.as_object()?;
        if branch.keys().any(|k| !BRANCH_KEYS.contains(&k.as_str())) {
            return None;
        }
        if branch.get("type").is_some_and(|t| t != "string") {
            return None;
        }
        for variant in branch.get("enum")?.as_array()? {
            if !variant.is_string() {
                return None;
            }
            variants.push(variant.clone());
        }
    }
    Some(variants)
}

/// Close every object schema and drop keywords strict mode rejects.
fn make_strict(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for keyword in UNSUPPORTED_KEYWORDS {
                map.remove(*keyword);
            }

            if is_object_schema(map) {
                map.insert("additionalProperties".to_string(), Value::Bool(false));

                let required: Vec<Value> = match map.get("properties") {
                    Some(Value::Object(props)) => {
                        props.keys().map(|k| Value::String(k.clone())).collect()
                    }
                    _ => Vec::new(),
                };
                map.insert("required".to_string(), Value::Array(required));
            }

            for (key, v) in map.iter_mut() {
                match (key.as_str(), v) {
                    // Property names are not keywords; only their schemas are.
                    ("properties", Value::Object(props)) => {
                        props.values_mut().for_each(make_strict)
                    }
                    (_, v) => make_strict(v),
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(make_strict),
        _ => {}
    }
}

fn is_object_schema(map: &Map<String, Value>) -> bool {
    match map.get("type") {
        Some(Value::String(t)) => t == "object",
        Some(Value::Array(types)) => types.iter().any(|t| t == "object"),
        _ => false,
    }
}

/// Replace `#/definitions/..` references with the referenced schema.
fn inline_refs(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            let target = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix("#/definitions/"))
                .and_then(|name| definitions.get(name))
                .cloned();

            if let Some(def) = target {
                *value = def;
                inline_refs(value, definitions);
                return;
            }

            for (_, v) in map.iter_mut() {
                inline_refs(v, definitions);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                inline_refs(item, definitions);
            }
        }
        _ => {}
    }
}
