use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::path::{CollectionId, ConcretePath, FactPath};

/// Tri-state read of a single fact.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FactResult {
    pub complete: bool,
    pub has_value: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl FactResult {
    pub fn complete(value: Value) -> Self {
        Self {
            complete: true,
            has_value: true,
            value: Some(value),
        }
    }

    /// A value is available but depends on something still missing.
    pub fn placeholder(value: Value) -> Self {
        Self {
            complete: false,
            has_value: true,
            value: Some(value),
        }
    }

    pub fn incomplete() -> Self {
        Self::default()
    }

    pub fn is_truthy(&self) -> bool {
        self.value.as_ref().is_some_and(truthy)
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(value) => *value,
        Value::Number(number) => number.as_f64().is_some_and(|value| value != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactError {
    #[error("unknown fact path '{0}'")]
    UnknownPath(String),
    #[error("fact '{0}' is not a collection")]
    NotACollection(String),
    #[error("fact store failure: {0}")]
    Store(String),
}

/// Read side of the fact graph the engine navigates over.
pub trait FactStore {
    fn get(&self, path: &ConcretePath) -> Result<FactResult, FactError>;

    /// Ordered members of the collection stored at `path`.
    fn collection_items(&self, path: &ConcretePath) -> Result<Vec<CollectionId>, FactError> {
        let result = self.get(path)?;
        if !result.complete {
            return Ok(Vec::new());
        }
        let items = match &result.value {
            Some(Value::Array(items)) => items,
            Some(Value::Object(map)) => match map.get("items") {
                Some(Value::Array(items)) => items,
                _ => return Err(FactError::NotACollection(path.to_string())),
            },
            _ => return Err(FactError::NotACollection(path.to_string())),
        };
        items
            .iter()
            .map(|item| match item {
                Value::String(id) => Ok(CollectionId::new(id.as_str())),
                _ => Err(FactError::NotACollection(path.to_string())),
            })
            .collect()
    }
}

/// The set of fact paths a flow may reference.
pub trait FactDictionary {
    fn contains(&self, path: &FactPath) -> bool;
}

impl FactDictionary for BTreeSet<FactPath> {
    fn contains(&self, path: &FactPath) -> bool {
        BTreeSet::contains(self, path)
    }
}

/// Snapshot of facts keyed by concrete path.
///
/// A missing or `null` entry reads as incomplete, `{"placeholder": v}` as a
/// placeholder and any other value as complete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InMemoryFactStore {
    facts: BTreeMap<String, Value>,
}

impl InMemoryFactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn with(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.set(path, value);
        self
    }

    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        self.facts.insert(path.to_string(), value.into());
    }

    pub fn set_placeholder(&mut self, path: &str, value: impl Into<Value>) {
        let mut wrapper = serde_json::Map::new();
        wrapper.insert("placeholder".into(), value.into());
        self.facts.insert(path.to_string(), Value::Object(wrapper));
    }

    pub fn remove(&mut self, path: &str) -> Option<Value> {
        self.facts.remove(path)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

impl FactStore for InMemoryFactStore {
    fn get(&self, path: &ConcretePath) -> Result<FactResult, FactError> {
        let Some(value) = self.facts.get(path.as_str()) else {
            return Ok(FactResult::incomplete());
        };
        if value.is_null() {
            return Ok(FactResult::incomplete());
        }
        if let Value::Object(map) = value
            && map.len() == 1
            && let Some(placeholder) = map.get("placeholder")
        {
            return Ok(FactResult::placeholder(placeholder.clone()));
        }
        Ok(FactResult::complete(value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn path(raw: &str) -> ConcretePath {
        ConcretePath::parse(raw).expect("concrete path")
    }

    #[test]
    fn reads_complete_placeholder_and_missing_facts() {
        let mut store = InMemoryFactStore::new().with("/flowTrue", true);
        store.set_placeholder("/estimate", false);

        assert_eq!(
            store.get(&path("/flowTrue")).unwrap(),
            FactResult::complete(json!(true))
        );
        let estimate = store.get(&path("/estimate")).unwrap();
        assert!(estimate.has_value && !estimate.complete);
        assert_eq!(store.get(&path("/missing")).unwrap(), FactResult::incomplete());
    }

    #[test]
    fn collection_items_preserve_store_order() {
        let store = InMemoryFactStore::from_json(json!({
            "/filers": ["b", "a"],
            "/dependents": { "items": ["x"] },
        }))
        .unwrap();
        assert_eq!(
            store.collection_items(&path("/filers")).unwrap(),
            vec![CollectionId::new("b"), CollectionId::new("a")]
        );
        assert_eq!(
            store.collection_items(&path("/dependents")).unwrap(),
            vec![CollectionId::new("x")]
        );
        assert!(store.collection_items(&path("/w2s")).unwrap().is_empty());
    }

    #[test]
    fn non_collection_value_is_reported() {
        let store = InMemoryFactStore::new().with("/filers", "oops");
        assert_eq!(
            store.collection_items(&path("/filers")),
            Err(FactError::NotACollection("/filers".into()))
        );
    }

    #[test]
    fn truthiness_follows_json_value() {
        assert!(FactResult::complete(json!(1)).is_truthy());
        assert!(!FactResult::complete(json!(0)).is_truthy());
        assert!(!FactResult::complete(json!("")).is_truthy());
        assert!(FactResult::complete(json!("x")).is_truthy());
        assert!(!FactResult::incomplete().is_truthy());
    }
}
