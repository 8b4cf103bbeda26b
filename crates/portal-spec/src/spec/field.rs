use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::spec::{Predicate, SchemaError};

/// Field kinds understood by the binder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldKind {
    Text,
    LongText,
    Ip,
    Bool,
    Choice,
}

impl FieldKind {
    pub const ALL: [FieldKind; 5] = [
        FieldKind::Text,
        FieldKind::LongText,
        FieldKind::Ip,
        FieldKind::Bool,
        FieldKind::Choice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "TEXT",
            FieldKind::LongText => "LONG_TEXT",
            FieldKind::Ip => "IP",
            FieldKind::Bool => "BOOL",
            FieldKind::Choice => "CHOICE",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == label)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One selectable option of a CHOICE field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ChoiceRepr", into = "ChoiceRepr")]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Accepted spellings of a choice: `[value, label]`, `{value, label}` or a bare value.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
enum ChoiceRepr {
    Pair(String, String),
    Entry { value: String, label: String },
    Bare(String),
}

impl From<ChoiceRepr> for Choice {
    fn from(repr: ChoiceRepr) -> Self {
        match repr {
            ChoiceRepr::Pair(value, label) | ChoiceRepr::Entry { value, label } => {
                Choice { value, label }
            }
            ChoiceRepr::Bare(value) => Choice {
                label: value.clone(),
                value,
            },
        }
    }
}

impl From<Choice> for ChoiceRepr {
    fn from(choice: Choice) -> Self {
        ChoiceRepr::Pair(choice.value, choice.label)
    }
}

/// Declarative description of a single form field.
///
/// `kind` keeps the authored type string so that a misspelled type survives
/// parsing and is reported by the binder instead of silently emptying the
/// whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schemars(with = "Vec<ChoiceRepr>")]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<bool>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub readonly: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schemars(with = "Vec<BTreeMap<String, Value>>")]
    pub requires: Vec<Predicate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schemars(with = "Vec<BTreeMap<String, Value>>")]
    pub requires_or: Vec<Predicate>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind: kind.as_str().to_string(),
            label: None,
            help_text: None,
            initial: None,
            choices: Vec::new(),
            mask: None,
            readonly: false,
            hidden: false,
            requires: Vec::new(),
            requires_or: Vec::new(),
        }
    }

    pub fn with_initial(mut self, initial: impl Into<Value>) -> Self {
        self.initial = Some(initial.into());
        self
    }

    /// Resolves the authored type string, naming the owning fieldset on failure.
    pub fn field_kind(&self, fieldset: &str) -> Result<FieldKind, SchemaError> {
        FieldKind::parse(&self.kind).ok_or_else(|| SchemaError::UnknownFieldType {
            fieldset: fieldset.to_string(),
            field: self.name.clone(),
            kind: self.kind.clone(),
        })
    }
}

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}
