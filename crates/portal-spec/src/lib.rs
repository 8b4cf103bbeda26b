#![allow(missing_docs)]

pub mod bind;
pub mod extensions;
pub mod normalize;
pub mod spec;
pub mod template;
pub mod validate;
pub mod visibility;

pub use bind::{
    BoundField, BoundFieldset, BoundStep, FieldDefaults, FieldParams, Widget, bind, bind_schema,
    deslugify,
};
pub use extensions::{ExtensionConfig, ExtensionError, SshKeyPair};
pub use normalize::{normalize, to_source_context};
pub use spec::{
    Choice, Context, FieldKind, FieldSchema, FieldsetSchema, Predicate, Schema, SchemaError,
};
pub use template::{TemplateError, TemplateRenderer};
pub use validate::{ValidationIssue, ValidationResult, validate};
pub use visibility::{Requirements, VisibilityMap, is_visible, resolve_visibility, visible_schema};
