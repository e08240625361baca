use serde::Serialize;

use crate::condition::ConditionError;
use crate::facts::FactStore;
use crate::flow::{CollectionLoopConfig, CompiledFlow, ScreenConfig};
use crate::path::CollectionId;

/// One collection member with the loop screens that apply to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopItem<'a> {
    pub id: CollectionId,
    pub screens: Vec<&'a ScreenConfig>,
    pub complete: bool,
}

impl<'a> LoopItem<'a> {
    /// Screens the router may step onto.
    pub fn routable_screens(&self) -> impl Iterator<Item = &'a ScreenConfig> {
        self.screens
            .iter()
            .copied()
            .filter(|screen| screen.route_automatically)
    }
}

/// A collection loop instantiated against the current collection members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopExpansion<'a> {
    pub loop_name: &'a str,
    pub auto_iterate: bool,
    /// One entry per member, in collection order.
    pub items: Vec<LoopItem<'a>>,
}

impl<'a> LoopExpansion<'a> {
    pub fn item(&self, id: &CollectionId) -> Option<&LoopItem<'a>> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// First member still missing data; the only one a manual loop exposes.
    pub fn active_item(&self) -> Option<&LoopItem<'a>> {
        self.items
            .iter()
            .find(|item| !item.complete && !item.screens.is_empty())
    }

    /// Members "next" stepping may visit, in order.
    pub fn navigable_items(&self) -> Vec<&LoopItem<'a>> {
        if self.auto_iterate {
            self.items
                .iter()
                .filter(|item| !item.screens.is_empty())
                .collect()
        } else {
            self.active_item().into_iter().collect()
        }
    }

    pub fn has_incomplete_item(&self) -> bool {
        self.active_item().is_some()
    }
}

/// Expands `collection_loop` once per member currently in its collection.
pub fn expand<'a>(
    collection_loop: &'a CollectionLoopConfig,
    flow: &'a CompiledFlow,
    store: &dyn FactStore,
) -> Result<LoopExpansion<'a>, ConditionError> {
    let ids = store.collection_items(&collection_loop.collection)?;
    let items = ids
        .into_iter()
        .map(|id| expand_item(collection_loop, flow, store, id))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LoopExpansion {
        loop_name: &collection_loop.loop_name,
        auto_iterate: collection_loop.auto_iterate,
        items,
    })
}

/// Expands a single member without reading the rest of the collection.
pub fn expand_item<'a>(
    collection_loop: &'a CollectionLoopConfig,
    flow: &'a CompiledFlow,
    store: &dyn FactStore,
    id: CollectionId,
) -> Result<LoopItem<'a>, ConditionError> {
    let mut screens = Vec::new();
    for index in &collection_loop.screens {
        let Some(screen) = flow.screen_at(*index) else {
            continue;
        };
        if screen.is_available(store, Some(&id))? {
            screens.push(screen);
        }
    }
    let complete = match &collection_loop.collection_item_completed_condition {
        Some(condition) => condition.evaluate(store, Some(&id))?,
        None => false,
    };
    Ok(LoopItem {
        id,
        screens,
        complete,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;
    use crate::condition::Condition;
    use crate::facts::InMemoryFactStore;
    use crate::path::FactPath;
    use crate::spec::{CategorySpec, CollectionLoopSpec, FlowSpec, ScreenSpec, SubcategorySpec};

    fn path(raw: &str) -> FactPath {
        FactPath::parse(raw).expect("valid path")
    }

    fn flow(auto_iterate: bool) -> CompiledFlow {
        let mut collection_loop = CollectionLoopSpec::new(
            "filers",
            path("/filers"),
            vec![
                ScreenSpec::new("name").into(),
                ScreenSpec::new("spouse-only")
                    .with_condition(Condition::fact(path("/filers/*/isSpouse")))
                    .into(),
            ],
        )
        .completed_when(Condition::fact(path("/filers/*/isDone")));
        if auto_iterate {
            collection_loop = collection_loop.auto_iterate();
        }
        let spec = FlowSpec::new(
            "expand",
            vec![
                CategorySpec::new(
                    "you",
                    vec![SubcategorySpec::new("filers", vec![collection_loop.into()]).into()],
                )
                .into(),
            ],
        );
        compile(&spec).expect("compile")
    }

    #[test]
    fn one_item_per_collection_member() {
        let flow = flow(true);
        let store = InMemoryFactStore::new()
            .with("/filers", serde_json::json!(["a", "b", "c"]))
            .with("/filers/#b/isSpouse", true);
        let collection_loop = flow.collection_loop("filers").expect("loop");
        let expansion = expand(collection_loop, &flow, &store).expect("expand");

        let ids: Vec<_> = expansion.items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(expansion.items[0].screens.len(), 1);
        assert_eq!(expansion.items[1].screens.len(), 2);
    }

    #[test]
    fn manual_loop_exposes_first_incomplete_item_only() {
        let flow = flow(false);
        let store = InMemoryFactStore::new()
            .with("/filers", serde_json::json!(["a", "b", "c"]))
            .with("/filers/#a/isDone", true);
        let collection_loop = flow.collection_loop("filers").expect("loop");
        let expansion = expand(collection_loop, &flow, &store).expect("expand");

        let navigable: Vec<_> = expansion
            .navigable_items()
            .iter()
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(navigable, ["b"]);
        assert!(expansion.items[0].complete);
    }

    #[test]
    fn empty_collection_expands_to_nothing() {
        let flow = flow(true);
        let store = InMemoryFactStore::new();
        let collection_loop = flow.collection_loop("filers").expect("loop");
        let expansion = expand(collection_loop, &flow, &store).expect("expand");
        assert!(expansion.items.is_empty());
        assert!(expansion.navigable_items().is_empty());
    }
}
