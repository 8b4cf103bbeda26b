//! Converts remote cookiecutter contexts into fieldset schemas.
//!
//! Two input shapes are understood: the legacy flat `cookiecutter.json`
//! mapping (one field per key) and an already structured list of fieldsets.

use std::net::Ipv4Addr;

use serde_json::Value;

use crate::spec::{Choice, FieldKind, FieldSchema, FieldsetSchema, Schema};

const BOOL_LITERALS: [&str; 4] = ["true", "True", "false", "False"];

/// Normalizes a raw context document into fieldsets.
///
/// Anything that is neither a mapping nor a sequence of fieldsets yields an
/// empty schema instead of an error.
pub fn normalize(raw: &Value, name: &str, label: &str) -> Schema {
    match raw {
        Value::Object(entries) => {
            let mut fieldset = FieldsetSchema::new(name, label);
            fieldset.fields = entries
                .iter()
                .map(|(key, value)| legacy_field(key, value))
                .collect();
            vec![fieldset]
        }
        Value::Array(_) => match serde_json::from_value::<Schema>(raw.clone()) {
            Ok(schema) => schema,
            Err(err) => {
                tracing::warn!(fieldset = name, error = %err, "discarding malformed fieldset document");
                Vec::new()
            }
        },
        _ => {
            tracing::debug!(fieldset = name, "context is not a mapping; nothing to normalize");
            Vec::new()
        }
    }
}

/// Serializes a schema into the YAML text kept as a step's source context.
pub fn to_source_context(schema: &[FieldsetSchema]) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(schema)
}

/// Infers the kind of a legacy scalar: IP, then BOOL, else TEXT.
pub fn infer_kind(value: &Value) -> FieldKind {
    if let Value::String(text) = value
        && is_ipv4(text)
    {
        return FieldKind::Ip;
    }
    if BOOL_LITERALS.contains(&string_form(value).as_str()) {
        return FieldKind::Bool;
    }
    FieldKind::Text
}

fn legacy_field(key: &str, value: &Value) -> FieldSchema {
    match value {
        // cookiecutter choice variable: the first option is the default
        Value::Array(options) => {
            let mut field = FieldSchema::new(key, FieldKind::Choice);
            field.choices = options
                .iter()
                .map(|option| {
                    let text = string_form(option);
                    Choice::new(text.clone(), text)
                })
                .collect();
            field.initial = options.first().map(|first| Value::String(string_form(first)));
            field
        }
        Value::Object(_) => {
            let mut field = FieldSchema::new(key, FieldKind::LongText);
            if is_truthy(value) {
                field.initial = serde_json::to_string_pretty(value).ok().map(Value::String);
            }
            field
        }
        scalar => {
            let mut field = FieldSchema::new(key, infer_kind(scalar));
            if is_truthy(scalar) {
                field.initial = Some(scalar.clone());
            }
            field
        }
    }
}

fn is_ipv4(text: &str) -> bool {
    text.parse::<Ipv4Addr>().is_ok()
}

fn string_form(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
