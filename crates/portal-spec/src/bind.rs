//! Turns visible field schemas into bound, ready-to-render fields.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::spec::{Choice, Context, FieldKind, FieldSchema, FieldsetSchema, SchemaError};
use crate::visibility::is_visible;

const TEXT_MAX_LENGTH: usize = 255;

/// Kind-specific attributes of a bound field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldParams {
    Text {
        max_length: usize,
    },
    LongText {
        #[serde(skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    Ip {
        mask: bool,
    },
    Bool,
    Choice {
        choices: Vec<Choice>,
    },
}

/// Presentation widget used by the host to draw a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Widget {
    TextInput,
    Textarea,
    IpInput,
    CheckboxInput,
    Select,
    HiddenInput,
}

impl Widget {
    pub fn supports_read_only(&self) -> bool {
        matches!(self, Widget::TextInput | Widget::Textarea | Widget::IpInput)
    }
}

/// Per-kind starting point of a bound field; built fresh for every field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefaults {
    pub params: FieldParams,
    pub required: bool,
    pub widget: Widget,
}

impl FieldDefaults {
    pub fn for_kind(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Text => Self {
                params: FieldParams::Text {
                    max_length: TEXT_MAX_LENGTH,
                },
                required: true,
                widget: Widget::TextInput,
            },
            FieldKind::LongText => Self {
                params: FieldParams::LongText { max_length: None },
                required: true,
                widget: Widget::Textarea,
            },
            FieldKind::Ip => Self {
                params: FieldParams::Ip { mask: true },
                required: true,
                widget: Widget::IpInput,
            },
            FieldKind::Bool => Self {
                params: FieldParams::Bool,
                required: false,
                widget: Widget::CheckboxInput,
            },
            FieldKind::Choice => Self {
                params: FieldParams::Choice {
                    choices: Vec::new(),
                },
                required: false,
                widget: Widget::Select,
            },
        }
    }
}

/// A field ready to be handed to the host form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundField {
    pub name: String,
    pub fieldset: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial: Option<Value>,
    pub required: bool,
    pub read_only: bool,
    pub widget: Widget,
    #[serde(flatten)]
    pub params: FieldParams,
}

impl BoundField {
    pub fn kind(&self) -> FieldKind {
        match self.params {
            FieldParams::Text { .. } => FieldKind::Text,
            FieldParams::LongText { .. } => FieldKind::LongText,
            FieldParams::Ip { .. } => FieldKind::Ip,
            FieldParams::Bool => FieldKind::Bool,
            FieldParams::Choice { .. } => FieldKind::Choice,
        }
    }

    pub fn choices(&self) -> &[Choice] {
        match &self.params {
            FieldParams::Choice { choices } => choices,
            _ => &[],
        }
    }
}

/// Section header plus the bound fields of one visible fieldset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundFieldset {
    pub name: String,
    pub label: String,
    pub fields: IndexMap<String, BoundField>,
}

/// Everything a step contributes to the host form, in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoundStep {
    pub fieldsets: Vec<BoundFieldset>,
}

impl BoundStep {
    pub fn fields(&self) -> impl Iterator<Item = &BoundField> {
        self.fieldsets
            .iter()
            .flat_map(|fieldset| fieldset.fields.values())
    }

    pub fn field(&self, name: &str) -> Option<&BoundField> {
        self.fieldsets
            .iter()
            .find_map(|fieldset| fieldset.fields.get(name))
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields().map(|field| field.name.clone()).collect()
    }
}

/// `"some_field"` → `"Some field"`.
pub fn deslugify(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Binds the visible fields of `fieldset` in declaration order.
///
/// Every field type is checked first, visible or not: an unknown type is an
/// authoring defect and aborts the whole fieldset.
pub fn bind(
    fieldset: &FieldsetSchema,
    ctx: &Context,
) -> Result<IndexMap<String, BoundField>, SchemaError> {
    let mut seen = HashSet::new();
    let mut kinds = Vec::with_capacity(fieldset.fields.len());
    for field in &fieldset.fields {
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaError::DuplicateField {
                fieldset: fieldset.name.clone(),
                field: field.name.clone(),
            });
        }
        kinds.push(field.field_kind(&fieldset.name)?);
    }

    Ok(fieldset
        .fields
        .iter()
        .zip(kinds)
        .filter(|(field, _)| is_visible(*field, ctx))
        .map(|(field, kind)| {
            let bound = bind_field(&fieldset.name, field, kind);
            (bound.name.clone(), bound)
        })
        .collect())
}

/// Binds every visible fieldset of a rendered schema.
///
/// Fieldset names must be unique across the document, hidden fieldsets included.
pub fn bind_schema(schema: &[FieldsetSchema], ctx: &Context) -> Result<BoundStep, SchemaError> {
    let mut names = HashSet::new();
    if let Some(duplicate) = schema
        .iter()
        .find(|fieldset| !names.insert(fieldset.name.as_str()))
    {
        return Err(SchemaError::DuplicateFieldset(duplicate.name.clone()));
    }

    let mut fieldsets = Vec::new();
    for fieldset in schema.iter().filter(|fieldset| is_visible(*fieldset, ctx)) {
        fieldsets.push(BoundFieldset {
            name: fieldset.name.clone(),
            label: fieldset.label.clone(),
            fields: bind(fieldset, ctx)?,
        });
    }
    Ok(BoundStep { fieldsets })
}

fn bind_field(fieldset: &str, field: &FieldSchema, kind: FieldKind) -> BoundField {
    let defaults = FieldDefaults::for_kind(kind);

    let params = match defaults.params {
        FieldParams::Ip { mask } => FieldParams::Ip {
            mask: field.mask.unwrap_or(mask),
        },
        FieldParams::Choice { .. } => FieldParams::Choice {
            choices: field.choices.clone(),
        },
        other => other,
    };

    let initial = match kind {
        FieldKind::Bool => field.initial.as_ref().map(coerce_flag),
        _ => field.initial.clone(),
    };

    let widget = if field.hidden {
        Widget::HiddenInput
    } else {
        defaults.widget
    };

    let read_only = field.readonly && defaults.widget.supports_read_only();
    if field.readonly && !read_only {
        tracing::debug!(field = %field.name, kind = %kind, "widget has no read-only mode; ignoring");
    }

    BoundField {
        name: field.name.clone(),
        fieldset: fieldset.to_string(),
        label: field
            .label
            .clone()
            .unwrap_or_else(|| deslugify(&field.name)),
        help_text: field.help_text.clone(),
        initial,
        required: defaults.required,
        read_only,
        widget,
        params,
    }
}

fn coerce_flag(value: &Value) -> Value {
    match value {
        Value::String(text) if text == "true" || text == "True" => Value::Bool(true),
        Value::String(text) if text == "false" || text == "False" => Value::Bool(false),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Predicate;
    use serde_json::json;

    #[test]
    fn deslugify_matches_capitalize() {
        assert_eq!(deslugify("cluster_domain"), "Cluster domain");
        assert_eq!(deslugify("DNS_server01"), "Dns server01");
        assert_eq!(deslugify(""), "");
    }

    #[test]
    fn defaults_are_fresh_per_kind() {
        assert_eq!(
            FieldDefaults::for_kind(FieldKind::Text).params,
            FieldParams::Text { max_length: 255 }
        );
        assert!(!FieldDefaults::for_kind(FieldKind::Choice).required);
        assert!(FieldDefaults::for_kind(FieldKind::Ip).required);
    }

    #[test]
    fn choice_without_choices_is_optional_and_empty() {
        let mut fieldset = FieldsetSchema::new("net", "Network");
        fieldset
            .fields
            .push(FieldSchema::new("backend", FieldKind::Choice));
        let bound = bind(&fieldset, &Context::new()).expect("bind");
        let field = &bound["backend"];
        assert_eq!(field.kind(), FieldKind::Choice);
        assert!(field.choices().is_empty());
        assert!(!field.required);
        assert_eq!(field.initial, None);
    }

    #[test]
    fn choices_do_not_leak_between_fields() {
        let mut fieldset = FieldsetSchema::new("net", "Network");
        let mut first = FieldSchema::new("first", FieldKind::Choice);
        first.choices = vec![Choice::new("a", "A")];
        fieldset.fields.push(first);
        fieldset
            .fields
            .push(FieldSchema::new("second", FieldKind::Choice));
        let bound = bind(&fieldset, &Context::new()).expect("bind");
        assert_eq!(bound["first"].choices().len(), 1);
        assert!(bound["second"].choices().is_empty());
    }

    #[test]
    fn overrides_label_mask_readonly_and_hidden() {
        let mut fieldset = FieldsetSchema::new("net", "Network");
        let mut gateway = FieldSchema::new("gateway", FieldKind::Ip).with_initial("10.0.0.1");
        gateway.mask = Some(false);
        gateway.readonly = true;
        gateway.help_text = Some("Default route".into());
        let mut flag = FieldSchema::new("dhcp", FieldKind::Bool).with_initial("True");
        flag.readonly = true;
        flag.label = Some("Use DHCP".into());
        let mut secret = FieldSchema::new("token", FieldKind::Text);
        secret.hidden = true;
        fieldset.fields = vec![gateway, flag, secret];

        let bound = bind(&fieldset, &Context::new()).expect("bind");
        let gateway = &bound["gateway"];
        assert_eq!(gateway.label, "Gateway");
        assert_eq!(gateway.kind(), FieldKind::Ip);
        assert_eq!(gateway.params, FieldParams::Ip { mask: false });
        assert!(gateway.read_only);
        assert_eq!(gateway.fieldset, "net");
        assert_eq!(gateway.help_text.as_deref(), Some("Default route"));

        let flag = &bound["dhcp"];
        assert_eq!(flag.label, "Use DHCP");
        assert!(!flag.read_only);
        assert_eq!(flag.initial, Some(json!(true)));

        assert_eq!(bound["token"].widget, Widget::HiddenInput);
    }

    #[test]
    fn unknown_type_fails_even_when_hidden() {
        let mut fieldset = FieldsetSchema::new("net", "Network");
        let mut field = FieldSchema::new("x", FieldKind::Text);
        field.kind = "SLIDER".into();
        field.requires = vec![Predicate::new("never", true)];
        fieldset.fields.push(field);
        assert!(matches!(
            bind(&fieldset, &Context::new()),
            Err(SchemaError::UnknownFieldType { .. })
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut fieldset = FieldsetSchema::new("net", "Network");
        fieldset.fields.push(FieldSchema::new("x", FieldKind::Text));
        fieldset.fields.push(FieldSchema::new("x", FieldKind::Bool));
        assert!(matches!(
            bind(&fieldset, &Context::new()),
            Err(SchemaError::DuplicateField { .. })
        ));
    }

    #[test]
    fn bound_field_serializes_flat() {
        let mut fieldset = FieldsetSchema::new("net", "Network");
        fieldset.fields.push(FieldSchema::new("vlan", FieldKind::Text));
        let bound = bind(&fieldset, &Context::new()).expect("bind");
        let value = serde_json::to_value(&bound["vlan"]).expect("json");
        assert_eq!(value["kind"], "TEXT");
        assert_eq!(value["max_length"], 255);
        assert_eq!(value["widget"], "text_input");
    }

    #[test]
    fn duplicate_fieldset_names_are_rejected() {
        let mut hidden = FieldsetSchema::new("net", "Hidden network");
        hidden.requires = vec![Predicate::new("advanced", true)];
        let schema = vec![FieldsetSchema::new("net", "Network"), hidden];
        assert_eq!(
            bind_schema(&schema, &Context::new()),
            Err(SchemaError::DuplicateFieldset("net".into()))
        );
    }
}
