use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::path::FactPath;

/// Screen content. Rendering details are opaque here; only the facts a
/// screen writes and the alerts it raises matter for navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentSpec {
    Fact(FactContent),
    SetFact(SetFactContent),
    Alert(AlertSpec),
    Static { component: String },
}

impl ContentSpec {
    /// Fact path declared by this item, if any.
    pub fn fact_path(&self) -> Option<&FactPath> {
        match self {
            ContentSpec::Fact(fact) => Some(&fact.path),
            ContentSpec::SetFact(action) => Some(&action.path),
            ContentSpec::Alert(_) | ContentSpec::Static { .. } => None,
        }
    }

    pub fn conditions(&self) -> &[Condition] {
        match self {
            ContentSpec::Fact(fact) => &fact.conditions,
            ContentSpec::SetFact(action) => &action.conditions,
            ContentSpec::Alert(alert) => &alert.conditions,
            ContentSpec::Static { .. } => &[],
        }
    }
}

/// Input bound to a fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FactContent {
    pub path: FactPath,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub read_only: bool,
}

impl FactContent {
    pub fn new(path: FactPath) -> Self {
        Self {
            path,
            conditions: Vec::new(),
            optional: false,
            read_only: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Whether the user is expected to supply this fact.
    pub fn is_required_input(&self) -> bool {
        !self.optional && !self.read_only
    }
}

/// Fact written by the screen itself when the user continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SetFactContent {
    pub path: FactPath,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AlertSpec {
    pub level: AlertLevel,
    pub i18n_key: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fact_paths: Vec<FactPath>,
}

impl AlertSpec {
    pub fn error(i18n_key: impl Into<String>) -> Self {
        Self::new(AlertLevel::Error, i18n_key)
    }

    pub fn warning(i18n_key: impl Into<String>) -> Self {
        Self::new(AlertLevel::Warning, i18n_key)
    }

    fn new(level: AlertLevel, i18n_key: impl Into<String>) -> Self {
        Self {
            level,
            i18n_key: i18n_key.into(),
            conditions: Vec::new(),
            fact_paths: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_fact_path(mut self, path: FactPath) -> Self {
        self.fact_paths.push(path);
        self
    }
}

impl From<FactContent> for ContentSpec {
    fn from(content: FactContent) -> Self {
        ContentSpec::Fact(content)
    }
}

impl From<AlertSpec> for ContentSpec {
    fn from(alert: AlertSpec) -> Self {
        ContentSpec::Alert(alert)
    }
}
