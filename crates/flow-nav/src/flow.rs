use std::collections::BTreeMap;

use serde::Serialize;

use crate::condition::{Condition, ConditionError, all_pass, any_pass};
use crate::facts::FactStore;
use crate::path::{CollectionId, ConcretePath, FactPath};
use crate::spec::{AlertAggregatorType, AlertSpec, ContentSpec, FactContent};

/// Position of a screen in authored order.
pub type ScreenIndex = usize;

/// A screen after compilation, with its ancestry flattened in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenConfig {
    pub index: ScreenIndex,
    pub route: String,
    pub category_route: String,
    pub subcategory_route: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_subcategory_route: Option<String>,
    /// Ancestor gate conditions followed by the screen's own condition.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_context: Option<FactPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_loop: Option<String>,
    pub route_automatically: bool,
    pub act_as_data_view: bool,
    pub is_knockout: bool,
    pub alert_aggregator_type: AlertAggregatorType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<ContentSpec>,
}

impl ScreenConfig {
    /// Evaluates the gate chain for one collection item (or none).
    pub fn is_available(
        &self,
        store: &dyn FactStore,
        collection_id: Option<&CollectionId>,
    ) -> Result<bool, ConditionError> {
        all_pass(&self.conditions, store, collection_id)
    }

    pub fn fact_paths(&self) -> impl Iterator<Item = &FactPath> {
        self.content.iter().filter_map(ContentSpec::fact_path)
    }

    pub fn fact_inputs(&self) -> impl Iterator<Item = &FactContent> {
        self.content.iter().filter_map(|item| match item {
            ContentSpec::Fact(fact) => Some(fact),
            _ => None,
        })
    }

    pub fn alerts(&self) -> impl Iterator<Item = &AlertSpec> {
        self.content.iter().filter_map(|item| match item {
            ContentSpec::Alert(alert) => Some(alert),
            _ => None,
        })
    }

    pub fn in_collection_loop(&self) -> bool {
        self.collection_loop.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryConfig {
    pub route: String,
    pub subcategories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubcategoryConfig {
    pub route: String,
    pub category_route: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub complete_if: Vec<Condition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub display_only_if: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_context: Option<FactPath>,
    pub skip_data_view: bool,
    pub screens: Vec<ScreenIndex>,
    pub sub_subcategories: Vec<String>,
    pub collection_loops: Vec<String>,
}

impl SubcategoryConfig {
    pub fn has_data_view(&self) -> bool {
        !self.skip_data_view
    }

    /// Whether the section is shown at all for this store snapshot.
    pub fn is_displayed(
        &self,
        store: &dyn FactStore,
        collection_id: Option<&CollectionId>,
    ) -> Result<bool, ConditionError> {
        if self.display_only_if.is_empty() {
            return Ok(true);
        }
        any_pass(&self.display_only_if, store, collection_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubSubcategoryConfig {
    pub route: String,
    pub subcategory_route: String,
    /// Last route segment, used as the data-view section anchor.
    pub section: String,
    pub screens: Vec<ScreenIndex>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionLoopConfig {
    pub loop_name: String,
    pub collection: ConcretePath,
    pub auto_iterate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_item_completed_condition: Option<Condition>,
    pub is_inner: bool,
    pub subcategory_route: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_subcategory_route: Option<String>,
    /// Contiguous, in authored order.
    pub screens: Vec<ScreenIndex>,
}

impl CollectionLoopConfig {
    pub fn first_screen(&self) -> Option<ScreenIndex> {
        self.screens.first().copied()
    }

    pub fn last_screen(&self) -> Option<ScreenIndex> {
        self.screens.last().copied()
    }
}

/// Lookup structures built once from a flow definition.
///
/// Immutable after [`crate::compile`]; share it by reference across any
/// number of navigation calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompiledFlow {
    pub(crate) id: String,
    pub(crate) categories: Vec<CategoryConfig>,
    pub(crate) screens: Vec<ScreenConfig>,
    pub(crate) screens_by_route: BTreeMap<String, ScreenIndex>,
    pub(crate) subcategories_by_route: BTreeMap<String, SubcategoryConfig>,
    pub(crate) sub_subcategories_by_route: BTreeMap<String, SubSubcategoryConfig>,
    pub(crate) collection_loops_by_name: BTreeMap<String, CollectionLoopConfig>,
    pub(crate) fact_index: BTreeMap<FactPath, Vec<ScreenIndex>>,
}

impl CompiledFlow {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn categories(&self) -> &[CategoryConfig] {
        &self.categories
    }

    pub fn screens(&self) -> &[ScreenConfig] {
        &self.screens
    }

    pub fn screen(&self, route: &str) -> Option<&ScreenConfig> {
        self.screens_by_route
            .get(route)
            .and_then(|index| self.screens.get(*index))
    }

    pub fn screen_at(&self, index: ScreenIndex) -> Option<&ScreenConfig> {
        self.screens.get(index)
    }

    pub fn subcategory(&self, route: &str) -> Option<&SubcategoryConfig> {
        self.subcategories_by_route.get(route)
    }

    /// Subcategories in authored order.
    pub fn subcategories(&self) -> impl Iterator<Item = &SubcategoryConfig> {
        self.categories.iter().flat_map(|category| {
            category
                .subcategories
                .iter()
                .filter_map(|route| self.subcategories_by_route.get(route))
        })
    }

    pub fn sub_subcategory(&self, route: &str) -> Option<&SubSubcategoryConfig> {
        self.sub_subcategories_by_route.get(route)
    }

    pub fn collection_loop(&self, name: &str) -> Option<&CollectionLoopConfig> {
        self.collection_loops_by_name.get(name)
    }

    pub fn collection_loops(&self) -> impl Iterator<Item = &CollectionLoopConfig> {
        self.collection_loops_by_name.values()
    }

    /// Loop a screen belongs to, if any.
    pub fn loop_of(&self, screen: &ScreenConfig) -> Option<&CollectionLoopConfig> {
        screen
            .collection_loop
            .as_deref()
            .and_then(|name| self.collection_loop(name))
    }

    pub fn fact_index(&self) -> &BTreeMap<FactPath, Vec<ScreenIndex>> {
        &self.fact_index
    }

    /// Screens declaring `path` in their content.
    pub fn screens_referencing(&self, path: &FactPath) -> impl Iterator<Item = &ScreenConfig> {
        self.fact_index
            .get(path)
            .into_iter()
            .flatten()
            .filter_map(|index| self.screens.get(*index))
    }
}
