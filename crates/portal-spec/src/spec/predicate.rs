use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::spec::Context;

/// Single equality test against the answer context.
///
/// Authored either as a one-entry map (`{role: admin}`) or in the explicit
/// `{key: role, value: admin}` form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Predicate {
    pub key: String,
    pub value: Value,
}

impl Predicate {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// An absent key never matches, even against a `null` expectation.
    pub fn matches(&self, ctx: &Context) -> bool {
        ctx.get(&self.key) == Some(&self.value)
    }
}

impl TryFrom<Map<String, Value>> for Predicate {
    type Error = String;

    fn try_from(mut map: Map<String, Value>) -> Result<Self, Self::Error> {
        if map.len() == 2
            && let Some(Value::String(key)) = map.get("key")
            && map.contains_key("value")
        {
            let key = key.clone();
            let value = map.remove("value").unwrap_or(Value::Null);
            return Ok(Self { key, value });
        }

        let mut entries = map.into_iter();
        match (entries.next(), entries.next()) {
            (Some((key, value)), None) => Ok(Self { key, value }),
            (None, _) => Err("requirement predicate is empty".to_string()),
            (Some(_), Some(_)) => {
                Err("requirement predicate must hold exactly one key/value pair".to_string())
            }
        }
    }
}

impl From<Predicate> for Map<String, Value> {
    fn from(predicate: Predicate) -> Self {
        let mut map = Map::new();
        map.insert(predicate.key, predicate.value);
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shorthand_and_explicit_forms_agree() {
        let short: Predicate = serde_json::from_value(json!({ "role": "admin" })).expect("short");
        let long: Predicate =
            serde_json::from_value(json!({ "key": "role", "value": "admin" })).expect("long");
        assert_eq!(short, long);
        assert_eq!(short, Predicate::new("role", "admin"));
    }

    #[test]
    fn multi_entry_map_is_rejected() {
        let result = serde_json::from_value::<Predicate>(json!({ "a": 1, "b": 2 }));
        assert!(result.is_err());
    }

    #[test]
    fn missing_key_does_not_match_null() {
        let predicate = Predicate::new("flag", Value::Null);
        assert!(!predicate.matches(&Context::new()));
    }
}
