use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::spec::{FieldKind, FieldSchema, FieldsetSchema};

/// Authoring problem found in a fieldset document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fieldset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
}

/// Reports every authoring problem in `schema` instead of stopping at the first.
pub fn validate(schema: &[FieldsetSchema]) -> ValidationResult {
    let mut issues = Vec::new();
    let mut fieldset_names = BTreeSet::new();

    for fieldset in schema {
        if !fieldset_names.insert(fieldset.name.as_str()) {
            issues.push(ValidationIssue {
                fieldset: Some(fieldset.name.clone()),
                field: None,
                message: "fieldset name is used more than once in the document".into(),
                code: "duplicate_fieldset".into(),
            });
        }

        let mut field_names = BTreeSet::new();
        for field in &fieldset.fields {
            if !field_names.insert(field.name.as_str()) {
                issues.push(field_issue(
                    fieldset,
                    field,
                    "field name is used more than once in the fieldset",
                    "duplicate_field",
                ));
            }
            match FieldKind::parse(&field.kind) {
                None => issues.push(field_issue(
                    fieldset,
                    field,
                    &format!("unknown field type '{}'", field.kind),
                    "unknown_type",
                )),
                Some(FieldKind::Choice) => {
                    if let Some(issue) = check_choice_initial(fieldset, field) {
                        issues.push(issue);
                    }
                }
                Some(_) => {}
            }
        }
    }

    ValidationResult {
        valid: issues.is_empty(),
        issues,
    }
}

fn check_choice_initial(fieldset: &FieldsetSchema, field: &FieldSchema) -> Option<ValidationIssue> {
    let initial = match field.initial.as_ref()? {
        Value::String(text) if text.is_empty() => return None,
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    if field.choices.iter().any(|choice| choice.value == initial) {
        return None;
    }
    Some(field_issue(
        fieldset,
        field,
        &format!("initial value '{initial}' is not one of the choices"),
        "choice_initial_mismatch",
    ))
}

fn field_issue(
    fieldset: &FieldsetSchema,
    field: &FieldSchema,
    message: &str,
    code: &str,
) -> ValidationIssue {
    ValidationIssue {
        fieldset: Some(fieldset.name.clone()),
        field: Some(field.name.clone()),
        message: message.into(),
        code: code.into(),
    }
}
