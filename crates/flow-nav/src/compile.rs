use std::collections::btree_map::Entry;

use thiserror::Error;
use tracing::debug;

use crate::condition::Condition;
use crate::facts::FactDictionary;
use crate::flow::{
    CategoryConfig, CollectionLoopConfig, CompiledFlow, ScreenConfig, SubSubcategoryConfig,
    SubcategoryConfig,
};
use crate::path::FactPath;
use crate::spec::{
    CategorySpec, CollectionLoopSpec, ContentSpec, FlowNode, FlowSpec, ScreenSpec,
    SubSubcategorySpec, SubcategorySpec,
};

/// Route prefix shared by every category.
pub const FLOW_ROUTE_PREFIX: &str = "/flow";

/// Authoring defects detected while compiling a flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("duplicate category route '{route}'")]
    DuplicateCategoryRoute { route: String },
    #[error("duplicate subcategory route '{route}'")]
    DuplicateSubcategoryRoute { route: String },
    #[error("duplicate screen route '{route}'")]
    DuplicateScreenRoute { route: String },
    #[error("duplicate collection loop name '{loop_name}'")]
    DuplicateLoopName { loop_name: String },
    #[error("{node} '{route}' must be placed {expected}")]
    Misplaced {
        node: &'static str,
        route: String,
        expected: &'static str,
    },
    #[error("invalid route fragment '{route}'")]
    InvalidRoute { route: String },
    #[error("collection loop '{inner}' is nested inside collection loop '{outer}'")]
    NestedCollectionLoop { outer: String, inner: String },
    #[error("inner collection loop '{loop_name}' must be placed inside a sub-subcategory")]
    InnerLoopOutsideSubSubcategory { loop_name: String },
    #[error("collection path '{path}' of '{owner}' must not contain a wildcard")]
    AbstractCollectionPath { owner: String, path: String },
    #[error("'{owner}' references '{path}' outside of any collection context")]
    MissingCollectionContext { owner: String, path: String },
    #[error("'{owner}' references unknown fact path '{path}'")]
    UnknownFactPath { owner: String, path: String },
}

/// Compiles an authored flow into its lookup structures.
pub fn compile(spec: &FlowSpec) -> Result<CompiledFlow, FlowError> {
    Compiler::new(None).run(spec)
}

/// Like [`compile`], additionally rejecting fact paths unknown to `dictionary`.
pub fn compile_with_dictionary(
    spec: &FlowSpec,
    dictionary: &dyn FactDictionary,
) -> Result<CompiledFlow, FlowError> {
    Compiler::new(Some(dictionary)).run(spec)
}

/// Ancestry accumulated on the way down the tree.
#[derive(Debug, Clone, Default)]
struct Scope {
    category: Option<String>,
    subcategory: Option<String>,
    sub_subcategory: Option<String>,
    conditions: Vec<Condition>,
    collection_context: Option<FactPath>,
    collection_loop: Option<String>,
}

struct Compiler<'a> {
    dictionary: Option<&'a dyn FactDictionary>,
    flow: CompiledFlow,
}

impl<'a> Compiler<'a> {
    fn new(dictionary: Option<&'a dyn FactDictionary>) -> Self {
        Self {
            dictionary,
            flow: CompiledFlow::default(),
        }
    }

    fn run(mut self, spec: &FlowSpec) -> Result<CompiledFlow, FlowError> {
        self.flow.id = spec.id.clone();
        self.nodes(&spec.children, &Scope::default())?;
        debug!(
            flow = %self.flow.id,
            categories = self.flow.categories.len(),
            subcategories = self.flow.subcategories_by_route.len(),
            screens = self.flow.screens.len(),
            collection_loops = self.flow.collection_loops_by_name.len(),
            "compiled flow"
        );
        Ok(self.flow)
    }

    fn nodes(&mut self, nodes: &[FlowNode], scope: &Scope) -> Result<(), FlowError> {
        for node in nodes {
            match node {
                FlowNode::Category(category) => self.category(category, scope)?,
                FlowNode::Subcategory(subcategory) => self.subcategory(subcategory, scope)?,
                FlowNode::SubSubcategory(sub_subcategory) => {
                    self.sub_subcategory(sub_subcategory, scope)?
                }
                FlowNode::Gate(gate) => {
                    let owner = scope_owner(scope);
                    self.check_condition(&owner, &gate.condition, scope)?;
                    let mut inner = scope.clone();
                    inner.conditions.push(gate.condition.clone());
                    self.nodes(&gate.children, &inner)?;
                }
                FlowNode::Screen(screen) => self.screen(screen, scope)?,
                FlowNode::CollectionLoop(collection_loop) => {
                    self.collection_loop(collection_loop, scope)?
                }
            }
        }
        Ok(())
    }

    fn category(&mut self, spec: &CategorySpec, scope: &Scope) -> Result<(), FlowError> {
        check_fragment(&spec.route)?;
        let route = format!("{FLOW_ROUTE_PREFIX}/{}", spec.route);
        if scope.category.is_some() {
            return Err(FlowError::Misplaced {
                node: "category",
                route,
                expected: "at the top level of the flow",
            });
        }
        if self
            .flow
            .categories
            .iter()
            .any(|category| category.route == route)
        {
            return Err(FlowError::DuplicateCategoryRoute { route });
        }
        self.flow.categories.push(CategoryConfig {
            route: route.clone(),
            subcategories: Vec::new(),
        });
        let mut inner = scope.clone();
        inner.category = Some(route);
        self.nodes(&spec.children, &inner)
    }

    fn subcategory(&mut self, spec: &SubcategorySpec, scope: &Scope) -> Result<(), FlowError> {
        check_fragment(&spec.route)?;
        let Some(category_route) = scope.category.clone() else {
            return Err(FlowError::Misplaced {
                node: "subcategory",
                route: spec.route.clone(),
                expected: "inside a category",
            });
        };
        let route = format!("{category_route}/{}", spec.route);
        if scope.subcategory.is_some() {
            return Err(FlowError::Misplaced {
                node: "subcategory",
                route,
                expected: "directly inside a category",
            });
        }
        if self.flow.subcategories_by_route.contains_key(&route) {
            return Err(FlowError::DuplicateSubcategoryRoute { route });
        }

        if let Some(context) = &spec.collection_context {
            self.check_known(&route, context)?;
            if context.is_abstract() {
                return Err(FlowError::AbstractCollectionPath {
                    owner: route,
                    path: context.to_string(),
                });
            }
        }
        let mut inner = scope.clone();
        inner.subcategory = Some(route.clone());
        inner.collection_context = spec.collection_context.clone();
        for condition in spec.complete_if.iter().chain(&spec.display_only_if) {
            self.check_condition(&route, condition, &inner)?;
        }

        self.flow.subcategories_by_route.insert(
            route.clone(),
            SubcategoryConfig {
                route: route.clone(),
                category_route: category_route.clone(),
                complete_if: spec.complete_if.clone(),
                display_only_if: spec.display_only_if.clone(),
                collection_context: spec.collection_context.clone(),
                skip_data_view: spec.skip_data_view,
                screens: Vec::new(),
                sub_subcategories: Vec::new(),
                collection_loops: Vec::new(),
            },
        );
        if let Some(category) = self
            .flow
            .categories
            .iter_mut()
            .find(|category| category.route == category_route)
        {
            category.subcategories.push(route);
        }
        self.nodes(&spec.children, &inner)
    }

    fn sub_subcategory(
        &mut self,
        spec: &SubSubcategorySpec,
        scope: &Scope,
    ) -> Result<(), FlowError> {
        check_fragment(&spec.route)?;
        let Some(subcategory_route) = scope.subcategory.clone() else {
            return Err(FlowError::Misplaced {
                node: "sub_subcategory",
                route: spec.route.clone(),
                expected: "inside a subcategory",
            });
        };
        let route = format!("{subcategory_route}/{}", spec.route);
        if scope.sub_subcategory.is_some() {
            return Err(FlowError::Misplaced {
                node: "sub_subcategory",
                route,
                expected: "outside of another sub-subcategory",
            });
        }
        // A route seen before in this subcategory continues the same section.
        if let Entry::Vacant(slot) = self.flow.sub_subcategories_by_route.entry(route.clone()) {
            slot.insert(SubSubcategoryConfig {
                route: route.clone(),
                subcategory_route: subcategory_route.clone(),
                section: spec.route.clone(),
                screens: Vec::new(),
            });
            if let Some(subcategory) = self
                .flow
                .subcategories_by_route
                .get_mut(&subcategory_route)
            {
                subcategory.sub_subcategories.push(route.clone());
            }
        }
        let mut inner = scope.clone();
        inner.sub_subcategory = Some(route);
        self.nodes(&spec.children, &inner)
    }

    fn collection_loop(
        &mut self,
        spec: &CollectionLoopSpec,
        scope: &Scope,
    ) -> Result<(), FlowError> {
        let Some(subcategory_route) = scope.subcategory.clone() else {
            return Err(FlowError::Misplaced {
                node: "collection_loop",
                route: spec.loop_name.clone(),
                expected: "inside a subcategory",
            });
        };
        if let Some(outer) = &scope.collection_loop {
            return Err(FlowError::NestedCollectionLoop {
                outer: outer.clone(),
                inner: spec.loop_name.clone(),
            });
        }
        if spec.is_inner && scope.sub_subcategory.is_none() {
            return Err(FlowError::InnerLoopOutsideSubSubcategory {
                loop_name: spec.loop_name.clone(),
            });
        }
        if self
            .flow
            .collection_loops_by_name
            .contains_key(&spec.loop_name)
        {
            return Err(FlowError::DuplicateLoopName {
                loop_name: spec.loop_name.clone(),
            });
        }
        self.check_known(&spec.loop_name, &spec.collection)?;
        let collection = match &spec.collection {
            FactPath::Concrete(path) => path.clone(),
            FactPath::Abstract(path) => {
                return Err(FlowError::AbstractCollectionPath {
                    owner: spec.loop_name.clone(),
                    path: path.as_str().to_string(),
                });
            }
        };

        let mut inner = scope.clone();
        inner.collection_loop = Some(spec.loop_name.clone());
        inner.collection_context = Some(spec.collection.clone());
        if let Some(condition) = &spec.collection_item_completed_condition {
            self.check_condition(&spec.loop_name, condition, &inner)?;
        }

        self.flow.collection_loops_by_name.insert(
            spec.loop_name.clone(),
            CollectionLoopConfig {
                loop_name: spec.loop_name.clone(),
                collection,
                auto_iterate: spec.auto_iterate,
                collection_item_completed_condition: spec
                    .collection_item_completed_condition
                    .clone(),
                is_inner: spec.is_inner,
                subcategory_route: subcategory_route.clone(),
                sub_subcategory_route: scope.sub_subcategory.clone(),
                screens: Vec::new(),
            },
        );
        if let Some(subcategory) = self
            .flow
            .subcategories_by_route
            .get_mut(&subcategory_route)
        {
            subcategory.collection_loops.push(spec.loop_name.clone());
        }
        self.nodes(&spec.children, &inner)
    }

    fn screen(&mut self, spec: &ScreenSpec, scope: &Scope) -> Result<(), FlowError> {
        check_fragment(&spec.route)?;
        let (Some(category_route), Some(subcategory_route)) =
            (scope.category.clone(), scope.subcategory.clone())
        else {
            return Err(FlowError::Misplaced {
                node: "screen",
                route: spec.route.clone(),
                expected: "inside a subcategory",
            });
        };
        let route = format!("{subcategory_route}/{}", spec.route);
        if self.flow.screens_by_route.contains_key(&route) {
            return Err(FlowError::DuplicateScreenRoute { route });
        }

        if let Some(condition) = &spec.condition {
            self.check_condition(&route, condition, scope)?;
        }
        for item in &spec.content {
            self.check_content(&route, item, scope)?;
        }

        let mut conditions = scope.conditions.clone();
        conditions.extend(spec.condition.iter().cloned());
        let index = self.flow.screens.len();
        let config = ScreenConfig {
            index,
            route: route.clone(),
            category_route,
            subcategory_route: subcategory_route.clone(),
            sub_subcategory_route: scope.sub_subcategory.clone(),
            conditions,
            collection_context: scope.collection_context.clone(),
            collection_loop: scope.collection_loop.clone(),
            route_automatically: spec.route_automatically,
            act_as_data_view: spec.act_as_data_view,
            is_knockout: spec.is_knockout,
            alert_aggregator_type: spec.alert_aggregator_type,
            content: spec.content.clone(),
        };

        for path in config.fact_paths() {
            let entry = self.flow.fact_index.entry(path.clone()).or_default();
            if entry.last() != Some(&index) {
                entry.push(index);
            }
        }
        if let Some(subcategory) = self.flow.subcategories_by_route.get_mut(&subcategory_route) {
            subcategory.screens.push(index);
        }
        if let Some(sub_subcategory) = scope
            .sub_subcategory
            .as_ref()
            .and_then(|route| self.flow.sub_subcategories_by_route.get_mut(route))
        {
            sub_subcategory.screens.push(index);
        }
        if let Some(collection_loop) = scope
            .collection_loop
            .as_ref()
            .and_then(|name| self.flow.collection_loops_by_name.get_mut(name))
        {
            collection_loop.screens.push(index);
        }
        self.flow.screens_by_route.insert(route, index);
        self.flow.screens.push(config);
        Ok(())
    }

    fn check_content(
        &self,
        owner: &str,
        item: &ContentSpec,
        scope: &Scope,
    ) -> Result<(), FlowError> {
        if let Some(path) = item.fact_path() {
            self.check_path(owner, path, scope)?;
        }
        if let ContentSpec::Alert(alert) = item {
            for path in &alert.fact_paths {
                self.check_path(owner, path, scope)?;
            }
        }
        for condition in item.conditions() {
            self.check_condition(owner, condition, scope)?;
        }
        Ok(())
    }

    fn check_condition(
        &self,
        owner: &str,
        condition: &Condition,
        scope: &Scope,
    ) -> Result<(), FlowError> {
        for path in condition.fact_paths() {
            self.check_path(owner, path, scope)?;
        }
        Ok(())
    }

    fn check_path(&self, owner: &str, path: &FactPath, scope: &Scope) -> Result<(), FlowError> {
        self.check_known(owner, path)?;
        if path.is_abstract() && scope.collection_context.is_none() {
            return Err(FlowError::MissingCollectionContext {
                owner: owner.to_string(),
                path: path.to_string(),
            });
        }
        Ok(())
    }

    fn check_known(&self, owner: &str, path: &FactPath) -> Result<(), FlowError> {
        match self.dictionary {
            Some(dictionary) if !dictionary.contains(path) => Err(FlowError::UnknownFactPath {
                owner: owner.to_string(),
                path: path.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

fn check_fragment(route: &str) -> Result<(), FlowError> {
    let valid = !route.is_empty()
        && route
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(FlowError::InvalidRoute {
            route: route.to_string(),
        })
    }
}

fn scope_owner(scope: &Scope) -> String {
    scope
        .collection_loop
        .clone()
        .or_else(|| scope.sub_subcategory.clone())
        .or_else(|| scope.subcategory.clone())
        .or_else(|| scope.category.clone())
        .unwrap_or_else(|| "flow".to_string())
}
