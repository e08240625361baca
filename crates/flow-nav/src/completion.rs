use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::alerts::{AlertSummary, collect_alerts};
use crate::condition::{ConditionError, all_pass};
use crate::expand::expand;
use crate::facts::FactStore;
use crate::flow::{CompiledFlow, ScreenConfig, SubcategoryConfig};
use crate::path::{CollectionId, FactPath};
use crate::router::{
    Destination, NavigationError, NavigationPosition, context_collection_id,
    first_screen_of_subcategory, lookup_subcategory,
};
use crate::spec::{AlertAggregatorType, ContentSpec};

/// Category hidden from the checklist unless configured otherwise.
pub const KNOCKOUT_CATEGORY: &str = "/flow/knockout";

/// Whether every `complete_if` condition of the subcategory passes and every
/// member of its loops satisfies the loop's completion condition.
pub fn is_subcategory_complete(
    flow: &CompiledFlow,
    store: &dyn FactStore,
    route: &str,
) -> Result<bool, NavigationError> {
    let subcategory = lookup_subcategory(flow, route)?;
    let id = context_collection_id(store, subcategory.collection_context.as_ref())?;
    subcategory_complete(flow, store, subcategory, id.as_ref())
}

fn subcategory_complete(
    flow: &CompiledFlow,
    store: &dyn FactStore,
    subcategory: &SubcategoryConfig,
    id: Option<&CollectionId>,
) -> Result<bool, NavigationError> {
    if !all_pass(&subcategory.complete_if, store, id)? {
        return Ok(false);
    }
    for name in &subcategory.collection_loops {
        let Some(collection_loop) = flow.collection_loop(name) else {
            continue;
        };
        if collection_loop.collection_item_completed_condition.is_none() {
            continue;
        }
        let expansion = expand(collection_loop, flow, store)?;
        if expansion.has_incomplete_item() {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Where to resume a subcategory: the first available screen that still
/// has a required input without a complete value.
pub fn first_incomplete_screen(
    flow: &CompiledFlow,
    store: &dyn FactStore,
    route: &str,
) -> Result<Option<NavigationPosition>, NavigationError> {
    let subcategory = lookup_subcategory(flow, route)?;
    let context_id = context_collection_id(store, subcategory.collection_context.as_ref())?;
    if !subcategory.is_displayed(store, context_id.as_ref())? {
        return Ok(None);
    }

    let mut visited_loops = BTreeSet::new();
    for screen in subcategory
        .screens
        .iter()
        .filter_map(|index| flow.screen_at(*index))
    {
        if let Some(collection_loop) = flow.loop_of(screen) {
            if !visited_loops.insert(collection_loop.loop_name.as_str()) {
                continue;
            }
            let expansion = expand(collection_loop, flow, store)?;
            for item in expansion.items.iter().filter(|item| !item.complete) {
                for screen in &item.screens {
                    if has_missing_input(screen, store, Some(&item.id))? {
                        return Ok(Some(NavigationPosition::in_item(
                            screen.route.clone(),
                            item.id.clone(),
                        )));
                    }
                }
            }
            continue;
        }
        if screen.is_available(store, context_id.as_ref())?
            && has_missing_input(screen, store, context_id.as_ref())?
        {
            return Ok(Some(NavigationPosition {
                route: screen.route.clone(),
                collection_id: context_id.clone(),
            }));
        }
    }
    Ok(None)
}

fn has_missing_input(
    screen: &ScreenConfig,
    store: &dyn FactStore,
    id: Option<&CollectionId>,
) -> Result<bool, ConditionError> {
    for item in &screen.content {
        let path = match item {
            ContentSpec::Fact(fact) if fact.is_required_input() => &fact.path,
            ContentSpec::SetFact(action) => &action.path,
            _ => continue,
        };
        if !all_pass(item.conditions(), store, id)? {
            continue;
        }
        if !read_complete(store, path, id)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn has_complete_input(
    screen: &ScreenConfig,
    store: &dyn FactStore,
    id: Option<&CollectionId>,
) -> Result<bool, ConditionError> {
    for fact in screen.fact_inputs().filter(|fact| fact.is_required_input()) {
        if all_pass(&fact.conditions, store, id)? && read_complete(store, &fact.path, id)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn read_complete(
    store: &dyn FactStore,
    path: &FactPath,
    id: Option<&CollectionId>,
) -> Result<bool, ConditionError> {
    let concrete = path
        .concretize(id)
        .map_err(|_| ConditionError::MissingCollectionId {
            path: path.to_string(),
        })?;
    Ok(store.get(&concrete)?.complete)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistOptions {
    #[serde(default = "default_excluded_categories")]
    pub excluded_categories: Vec<String>,
}

impl Default for ChecklistOptions {
    fn default() -> Self {
        Self {
            excluded_categories: default_excluded_categories(),
        }
    }
}

fn default_excluded_categories() -> Vec<String> {
    vec![KNOCKOUT_CATEGORY.to_string()]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistCategory {
    pub route: String,
    pub subcategories: Vec<ChecklistSubcategory>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistSubcategory {
    pub route: String,
    pub is_complete: bool,
    pub is_next: bool,
    pub is_started_but_not_complete: bool,
    pub has_incomplete_collection_item: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<Destination>,
    #[serde(skip_serializing_if = "AlertSummary::is_empty")]
    pub alerts: AlertSummary,
}

/// Checklist state for every displayed subcategory, in authored order.
///
/// Sections complete strictly in order: a subcategory only counts as
/// complete while every displayed subcategory before it does too.
pub fn checklist(
    flow: &CompiledFlow,
    store: &dyn FactStore,
    options: &ChecklistOptions,
) -> Result<Vec<ChecklistCategory>, NavigationError> {
    let mut categories = Vec::new();
    let mut previous_complete = true;

    for category in flow.categories() {
        if options.excluded_categories.contains(&category.route) {
            continue;
        }
        let mut category_active = false;
        let mut subcategories = Vec::new();

        for route in &category.subcategories {
            let subcategory = lookup_subcategory(flow, route)?;
            let context_id =
                context_collection_id(store, subcategory.collection_context.as_ref())?;
            if !subcategory.is_displayed(store, context_id.as_ref())? {
                continue;
            }

            let started = has_some_completed_facts(flow, store, subcategory, context_id.as_ref())?;
            // Reads the category state left by the sections before this one.
            let has_incomplete_collection_item = category_active
                && previous_complete
                && started
                && has_incomplete_collection_item(flow, store, subcategory)?;

            let is_complete = previous_complete
                && subcategory_complete(flow, store, subcategory, context_id.as_ref())?;
            let mut is_next = previous_complete && !is_complete;
            if is_next || is_complete {
                category_active = true;
            }

            let destination = if !(is_next || is_complete) {
                None
            } else if subcategory.has_data_view() && (is_complete || started) {
                Some(data_view_destination(flow, store, subcategory, context_id.as_ref())?)
            } else {
                first_screen_of_subcategory(flow, store, route)?.map(Destination::Screen)
            };
            if is_next {
                if destination.is_some() {
                    previous_complete = false;
                } else {
                    // Nothing to show yet, so the section cannot block the next one.
                    is_next = false;
                }
            }

            let alerts = if category_active {
                collect_alerts(flow, store, route, AlertAggregatorType::Sections, None)?
            } else {
                AlertSummary::default()
            };

            subcategories.push(ChecklistSubcategory {
                route: route.clone(),
                is_complete,
                is_next,
                is_started_but_not_complete: is_next && started,
                has_incomplete_collection_item,
                destination,
                alerts,
            });
        }

        categories.push(ChecklistCategory {
            route: category.route.clone(),
            subcategories,
        });
    }
    Ok(categories)
}

/// Whether the user has entered anything in the subcategory yet.
fn has_some_completed_facts(
    flow: &CompiledFlow,
    store: &dyn FactStore,
    subcategory: &SubcategoryConfig,
    context_id: Option<&CollectionId>,
) -> Result<bool, NavigationError> {
    for screen in subcategory
        .screens
        .iter()
        .filter_map(|index| flow.screen_at(*index))
        .filter(|screen| !screen.in_collection_loop())
    {
        if screen.is_available(store, context_id)? && has_complete_input(screen, store, context_id)?
        {
            return Ok(true);
        }
    }
    for name in &subcategory.collection_loops {
        let Some(collection_loop) = flow.collection_loop(name) else {
            continue;
        };
        if !collection_loop.auto_iterate
            && !store
                .collection_items(&collection_loop.collection)?
                .is_empty()
        {
            return Ok(true);
        }
    }
    Ok(false)
}

fn has_incomplete_collection_item(
    flow: &CompiledFlow,
    store: &dyn FactStore,
    subcategory: &SubcategoryConfig,
) -> Result<bool, NavigationError> {
    for name in &subcategory.collection_loops {
        let Some(collection_loop) = flow.collection_loop(name) else {
            continue;
        };
        if collection_loop.collection_item_completed_condition.is_some()
            && expand(collection_loop, flow, store)?.has_incomplete_item()
        {
            return Ok(true);
        }
    }
    Ok(false)
}

fn data_view_destination(
    flow: &CompiledFlow,
    store: &dyn FactStore,
    subcategory: &SubcategoryConfig,
    context_id: Option<&CollectionId>,
) -> Result<Destination, NavigationError> {
    for screen in subcategory
        .screens
        .iter()
        .filter_map(|index| flow.screen_at(*index))
        .filter(|screen| screen.act_as_data_view && !screen.in_collection_loop())
    {
        if screen.is_available(store, context_id)? {
            return Ok(Destination::Screen(NavigationPosition {
                route: screen.route.clone(),
                collection_id: context_id.cloned(),
            }));
        }
    }
    Ok(Destination::SubcategoryDataView {
        subcategory_route: subcategory.route.clone(),
        section: None,
    })
}
