use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::facts::{FactError, FactResult, FactStore};
use crate::path::{CollectionId, FactPath};

/// Predicate applied to a single fact read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    #[default]
    IsTrue,
    IsTrueAndComplete,
    IsTrueOrIncomplete,
    IsFalse,
    IsFalseAndComplete,
    IsFalseOrIncomplete,
    IsComplete,
    IsCompleteAndHasValue,
    IsIncomplete,
}

impl ConditionOperator {
    pub fn apply(self, fact: &FactResult) -> bool {
        match self {
            ConditionOperator::IsTrue => fact.has_value && fact.is_truthy(),
            ConditionOperator::IsTrueAndComplete => fact.complete && fact.is_truthy(),
            ConditionOperator::IsTrueOrIncomplete => !fact.complete || fact.is_truthy(),
            ConditionOperator::IsFalse => fact.has_value && !fact.is_truthy(),
            ConditionOperator::IsFalseAndComplete => fact.complete && !fact.is_truthy(),
            ConditionOperator::IsFalseOrIncomplete => !fact.complete || !fact.is_truthy(),
            ConditionOperator::IsComplete => fact.complete,
            ConditionOperator::IsCompleteAndHasValue => {
                fact.complete && fact.value.as_ref().is_some_and(|value| !value.is_null())
            }
            ConditionOperator::IsIncomplete => !fact.complete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CombinatorKind {
    And,
    Or,
}

/// Boolean expression over facts.
///
/// A bare path is shorthand for `is_true` on that path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Condition {
    Fact(FactPath),
    Atomic {
        #[serde(default)]
        operator: ConditionOperator,
        path: FactPath,
    },
    Combinator {
        kind: CombinatorKind,
        #[serde(default)]
        children: Vec<Condition>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("condition on '{path}' needs a collection item id")]
    MissingCollectionId { path: String },
    #[error(transparent)]
    Fact(#[from] FactError),
}

impl Condition {
    pub fn fact(path: FactPath) -> Self {
        Condition::Fact(path)
    }

    pub fn atomic(operator: ConditionOperator, path: FactPath) -> Self {
        Condition::Atomic { operator, path }
    }

    pub fn and(children: Vec<Condition>) -> Self {
        Condition::Combinator {
            kind: CombinatorKind::And,
            children,
        }
    }

    pub fn or(children: Vec<Condition>) -> Self {
        Condition::Combinator {
            kind: CombinatorKind::Or,
            children,
        }
    }

    /// Evaluates against `store`, concretizing wildcard paths with `collection_id`.
    pub fn evaluate(
        &self,
        store: &dyn FactStore,
        collection_id: Option<&CollectionId>,
    ) -> Result<bool, ConditionError> {
        match self {
            Condition::Fact(path) => {
                evaluate_atomic(ConditionOperator::IsTrue, path, store, collection_id)
            }
            Condition::Atomic { operator, path } => {
                evaluate_atomic(*operator, path, store, collection_id)
            }
            Condition::Combinator {
                kind: CombinatorKind::And,
                children,
            } => all_pass(children, store, collection_id),
            Condition::Combinator {
                kind: CombinatorKind::Or,
                children,
            } => {
                for child in children {
                    if child.evaluate(store, collection_id)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// Every path referenced anywhere in the expression, in authored order.
    pub fn fact_paths(&self) -> Vec<&FactPath> {
        let mut out = Vec::new();
        self.collect_paths(&mut out);
        out
    }

    fn collect_paths<'a>(&'a self, out: &mut Vec<&'a FactPath>) {
        match self {
            Condition::Fact(path) | Condition::Atomic { path, .. } => out.push(path),
            Condition::Combinator { children, .. } => {
                for child in children {
                    child.collect_paths(out);
                }
            }
        }
    }
}

impl From<FactPath> for Condition {
    fn from(path: FactPath) -> Self {
        Condition::Fact(path)
    }
}

fn evaluate_atomic(
    operator: ConditionOperator,
    path: &FactPath,
    store: &dyn FactStore,
    collection_id: Option<&CollectionId>,
) -> Result<bool, ConditionError> {
    let concrete = path
        .concretize(collection_id)
        .map_err(|_| ConditionError::MissingCollectionId {
            path: path.to_string(),
        })?;
    let fact = store.get(&concrete)?;
    Ok(operator.apply(&fact))
}

/// True when every condition passes; an empty list passes.
pub fn all_pass(
    conditions: &[Condition],
    store: &dyn FactStore,
    collection_id: Option<&CollectionId>,
) -> Result<bool, ConditionError> {
    for condition in conditions {
        if !condition.evaluate(store, collection_id)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// True when at least one condition passes; an empty list fails.
pub fn any_pass(
    conditions: &[Condition],
    store: &dyn FactStore,
    collection_id: Option<&CollectionId>,
) -> Result<bool, ConditionError> {
    for condition in conditions {
        if condition.evaluate(store, collection_id)? {
            return Ok(true);
        }
    }
    Ok(false)
}
