use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Segment standing in for "any member of the collection".
pub const WILDCARD: &str = "*";

const ITEM_MARKER: char = '#';

/// Opaque id of one member of a collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CollectionId(String);

impl CollectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CollectionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CollectionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("fact path '{0}' must start with '/'")]
    NotAbsolute(String),
    #[error("fact path '{0}' contains an empty segment")]
    EmptySegment(String),
    #[error("fact path '{0}' contains more than one wildcard segment")]
    MultipleWildcards(String),
    #[error("fact path '{0}' contains a wildcard and cannot be used as a concrete path")]
    UnexpectedWildcard(String),
    #[error("fact path '{0}' contains a wildcard but no collection item id was supplied")]
    MissingCollectionId(String),
}

/// Path with exactly one wildcard segment, e.g. `/filers/*/firstName`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AbstractPath {
    raw: String,
    wildcard: usize,
}

impl AbstractPath {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Concrete path of the collection the wildcard ranges over (`/filers`).
    pub fn collection(&self) -> ConcretePath {
        let prefix = segments(&self.raw)
            .take(self.wildcard)
            .collect::<Vec<_>>()
            .join("/");
        ConcretePath(format!("/{prefix}"))
    }

    /// Replaces the wildcard with the given item: `/filers/#<id>/firstName`.
    pub fn concretize(&self, id: &CollectionId) -> ConcretePath {
        let joined = segments(&self.raw)
            .enumerate()
            .map(|(idx, segment)| {
                if idx == self.wildcard {
                    Cow::Owned(format!("{ITEM_MARKER}{id}"))
                } else {
                    Cow::Borrowed(segment)
                }
            })
            .collect::<Vec<_>>()
            .join("/");
        ConcretePath(format!("/{joined}"))
    }
}

/// Path without wildcards; the only kind a fact store is asked about.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ConcretePath(String);

impl ConcretePath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        match FactPath::parse(raw)? {
            FactPath::Concrete(path) => Ok(path),
            FactPath::Abstract(_) => Err(PathError::UnexpectedWildcard(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConcretePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fact path as authors write it in a flow definition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FactPath {
    Abstract(AbstractPath),
    Concrete(ConcretePath),
}

impl FactPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if !raw.starts_with('/') {
            return Err(PathError::NotAbsolute(raw.to_string()));
        }
        let mut wildcard = None;
        for (idx, segment) in segments(raw).enumerate() {
            if segment.is_empty() {
                return Err(PathError::EmptySegment(raw.to_string()));
            }
            if segment == WILDCARD {
                if wildcard.is_some() {
                    return Err(PathError::MultipleWildcards(raw.to_string()));
                }
                wildcard = Some(idx);
            }
        }
        Ok(match wildcard {
            Some(wildcard) => FactPath::Abstract(AbstractPath {
                raw: raw.to_string(),
                wildcard,
            }),
            None => FactPath::Concrete(ConcretePath(raw.to_string())),
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            FactPath::Abstract(path) => path.as_str(),
            FactPath::Concrete(path) => path.as_str(),
        }
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self, FactPath::Abstract(_))
    }

    /// Resolves the path for a read. Concrete paths ignore `id`.
    pub fn concretize(&self, id: Option<&CollectionId>) -> Result<ConcretePath, PathError> {
        match (self, id) {
            (FactPath::Concrete(path), _) => Ok(path.clone()),
            (FactPath::Abstract(path), Some(id)) => Ok(path.concretize(id)),
            (FactPath::Abstract(path), None) => {
                Err(PathError::MissingCollectionId(path.raw.clone()))
            }
        }
    }
}

impl fmt::Display for FactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FactPath {
    type Err = PathError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

impl TryFrom<String> for FactPath {
    type Error = PathError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<FactPath> for String {
    fn from(path: FactPath) -> Self {
        match path {
            FactPath::Abstract(path) => path.raw,
            FactPath::Concrete(path) => path.0,
        }
    }
}

impl From<ConcretePath> for FactPath {
    fn from(path: ConcretePath) -> Self {
        FactPath::Concrete(path)
    }
}

impl JsonSchema for FactPath {
    fn schema_name() -> Cow<'static, str> {
        Cow::Borrowed("FactPath")
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        String::json_schema(generator)
    }
}

fn segments(raw: &str) -> impl Iterator<Item = &str> {
    raw.strip_prefix('/').unwrap_or(raw).split('/')
}
