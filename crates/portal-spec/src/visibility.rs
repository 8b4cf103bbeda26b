use crate::spec::{Context, FieldSchema, FieldsetSchema, Predicate, Schema};

pub type VisibilityMap = std::collections::BTreeMap<String, bool>;

/// Anything carrying `requires` / `requires_or` predicates.
pub trait Requirements {
    fn requires(&self) -> &[Predicate];
    fn requires_or(&self) -> &[Predicate];
}

impl Requirements for FieldSchema {
    fn requires(&self) -> &[Predicate] {
        &self.requires
    }

    fn requires_or(&self) -> &[Predicate] {
        &self.requires_or
    }
}

impl Requirements for FieldsetSchema {
    fn requires(&self) -> &[Predicate] {
        &self.requires
    }

    fn requires_or(&self) -> &[Predicate] {
        &self.requires_or
    }
}

/// `requires` must all match, `requires_or` needs one match when non-empty.
pub fn is_visible(item: &impl Requirements, ctx: &Context) -> bool {
    let all = item.requires().iter().all(|predicate| predicate.matches(ctx));
    let any = item.requires_or().is_empty()
        || item.requires_or().iter().any(|predicate| predicate.matches(ctx));
    all && any
}

/// Copy of `schema` without the fieldsets and fields hidden by `ctx`.
pub fn visible_schema(schema: &[FieldsetSchema], ctx: &Context) -> Schema {
    schema
        .iter()
        .filter(|fieldset| is_visible(*fieldset, ctx))
        .map(|fieldset| FieldsetSchema {
            fields: fieldset
                .fields
                .iter()
                .filter(|field| is_visible(*field, ctx))
                .cloned()
                .collect(),
            ..fieldset.clone()
        })
        .collect()
}

/// Per-field visibility; a field inside a hidden fieldset is hidden.
pub fn resolve_visibility(schema: &[FieldsetSchema], ctx: &Context) -> VisibilityMap {
    let mut map = VisibilityMap::new();
    for fieldset in schema {
        let fieldset_visible = is_visible(fieldset, ctx);
        for field in &fieldset.fields {
            map.insert(field.name.clone(), fieldset_visible && is_visible(field, ctx));
        }
    }
    map
}
