pub mod field;
pub mod fieldset;
pub mod predicate;

use serde_json::{Map, Value};
use thiserror::Error;

pub use field::{Choice, FieldKind, FieldSchema};
pub use fieldset::FieldsetSchema;
pub use predicate::Predicate;

/// Accumulated answers shared by every step of a wizard.
pub type Context = Map<String, Value>;

/// A rendered source context: the ordered fieldsets of one wizard step.
pub type Schema = Vec<FieldsetSchema>;

/// Schema authoring defects that cannot be recovered from at binding time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("field '{field}' in fieldset '{fieldset}' has unknown type '{kind}'")]
    UnknownFieldType {
        fieldset: String,
        field: String,
        kind: String,
    },
    #[error("field '{field}' is declared more than once in fieldset '{fieldset}'")]
    DuplicateField { fieldset: String, field: String },
    #[error("fieldset '{0}' is declared more than once")]
    DuplicateFieldset(String),
}
