use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

use crate::condition::ConditionError;
use crate::expand::{expand, expand_item};
use crate::facts::{FactError, FactStore};
use crate::flow::{
    CollectionLoopConfig, CompiledFlow, ScreenConfig, ScreenIndex, SubcategoryConfig,
};
use crate::path::{CollectionId, FactPath};

pub const CHECKLIST_ROUTE: &str = "/checklist";
pub const DATA_VIEW_ROUTE: &str = "/data-view";

/// Where the user is, or is being sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NavigationPosition {
    pub route: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<CollectionId>,
}

impl NavigationPosition {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            collection_id: None,
        }
    }

    pub fn in_item(route: impl Into<String>, id: impl Into<CollectionId>) -> Self {
        Self {
            route: route.into(),
            collection_id: Some(id.into()),
        }
    }
}

/// Result of a routing decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Destination {
    Screen(NavigationPosition),
    SubcategoryDataView {
        subcategory_route: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        section: Option<String>,
    },
    CollectionItemDataView {
        loop_name: String,
        collection_id: CollectionId,
    },
    Checklist,
}

impl Destination {
    pub fn screen(&self) -> Option<&NavigationPosition> {
        match self {
            Destination::Screen(position) => Some(position),
            _ => None,
        }
    }

    pub fn url(&self) -> String {
        match self {
            Destination::Screen(position) => match &position.collection_id {
                Some(id) => format!("{}?id={}", position.route, encode(id.as_str())),
                None => position.route.clone(),
            },
            Destination::SubcategoryDataView {
                subcategory_route,
                section: Some(section),
            } => format!("{DATA_VIEW_ROUTE}{subcategory_route}#{section}"),
            Destination::SubcategoryDataView {
                subcategory_route,
                section: None,
            } => format!("{DATA_VIEW_ROUTE}{subcategory_route}"),
            Destination::CollectionItemDataView {
                loop_name,
                collection_id,
            } => format!(
                "{DATA_VIEW_ROUTE}/loop/{}/{}",
                encode(loop_name),
                encode(collection_id.as_str())
            ),
            Destination::Checklist => CHECKLIST_ROUTE.to_string(),
        }
    }
}

fn encode(raw: &str) -> String {
    utf8_percent_encode(raw, NON_ALPHANUMERIC).to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NavigationOptions {
    /// Review mode: finishing a sub-subcategory returns to its data view.
    #[serde(default)]
    pub navigate_to_data_view_at_end_of_sub_subcategory: bool,
    /// Leaving a subcategory returns to its data view or the checklist.
    #[serde(default)]
    pub return_to_checklist_at_end_of_subcategory: bool,
}

impl NavigationOptions {
    pub fn review() -> Self {
        Self {
            navigate_to_data_view_at_end_of_sub_subcategory: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("no screen is registered for route '{route}'")]
    UnknownRoute { route: String },
    #[error("no subcategory is registered for route '{route}'")]
    UnknownSubcategory { route: String },
    #[error("no collection loop named '{loop_name}'")]
    UnknownLoop { loop_name: String },
    #[error("screen '{route}' belongs to collection loop '{loop_name}' and needs a collection item id")]
    MissingCollectionId { route: String, loop_name: String },
    #[error("'{id}' is not a member of collection '{collection}'")]
    UnknownCollectionItem {
        collection: String,
        id: CollectionId,
    },
    #[error(transparent)]
    Condition(#[from] ConditionError),
    #[error(transparent)]
    Fact(#[from] FactError),
}

/// Computes where "continue" leads from `current`.
pub fn next_screen(
    flow: &CompiledFlow,
    store: &dyn FactStore,
    current: &NavigationPosition,
    options: NavigationOptions,
) -> Result<Destination, NavigationError> {
    let destination = Router::new(flow, store).next(current, options)?;
    trace!(from = %current.route, to = %destination.url(), "next screen");
    Ok(destination)
}

/// Computes where "back" leads from `current`.
///
/// Not the inverse of [`next_screen`]: entering a manual collection loop
/// backwards lands on its active item, not on the item that was left.
pub fn previous_screen(
    flow: &CompiledFlow,
    store: &dyn FactStore,
    current: &NavigationPosition,
) -> Result<Destination, NavigationError> {
    let destination = Router::new(flow, store).previous(current)?;
    trace!(from = %current.route, to = %destination.url(), "previous screen");
    Ok(destination)
}

/// First screen to show for `id`, e.g. right after adding it from a hub.
pub fn first_screen_of_loop_item(
    flow: &CompiledFlow,
    store: &dyn FactStore,
    loop_name: &str,
    id: &CollectionId,
) -> Result<Option<NavigationPosition>, NavigationError> {
    let collection_loop = lookup_loop(flow, loop_name)?;
    ensure_member(store, collection_loop, id)?;
    let item = expand_item(collection_loop, flow, store, id.clone())?;
    Ok(item
        .routable_screens()
        .next()
        .map(|screen| NavigationPosition::in_item(screen.route.clone(), id.clone())))
}

/// Where "done" on a collection hub leads: the first screen after the loop.
pub fn next_after_loop(
    flow: &CompiledFlow,
    store: &dyn FactStore,
    loop_name: &str,
) -> Result<Destination, NavigationError> {
    let collection_loop = lookup_loop(flow, loop_name)?;
    let router = Router::new(flow, store);
    let (Some(first), Some(last)) =
        (collection_loop.first_screen(), collection_loop.last_screen())
    else {
        return Ok(Destination::Checklist);
    };
    let Some(origin) = flow.screen_at(first) else {
        return Ok(Destination::Checklist);
    };
    Ok(router
        .scan_forward(origin, None, last + 1, &|_: &ScreenConfig| true)?
        .map_or(Destination::Checklist, Step::into_destination))
}

/// First screen "start" on a subcategory leads to.
pub fn first_screen_of_subcategory(
    flow: &CompiledFlow,
    store: &dyn FactStore,
    route: &str,
) -> Result<Option<NavigationPosition>, NavigationError> {
    let subcategory = lookup_subcategory(flow, route)?;
    let Some(origin) = subcategory
        .screens
        .first()
        .and_then(|index| flow.screen_at(*index))
    else {
        return Ok(None);
    };
    let in_subcategory =
        |candidate: &ScreenConfig| candidate.subcategory_route == subcategory.route;
    let step = Router::new(flow, store).scan_forward(origin, None, origin.index, &in_subcategory)?;
    Ok(step.map(Step::into_position))
}

/// Item id a non-loop context fact points at, e.g. `/primaryFiler`.
pub(crate) fn context_collection_id(
    store: &dyn FactStore,
    context: Option<&FactPath>,
) -> Result<Option<CollectionId>, FactError> {
    let Some(FactPath::Concrete(path)) = context else {
        return Ok(None);
    };
    let fact = store.get(path)?;
    Ok(match fact.value {
        Some(Value::String(id)) if fact.complete => Some(CollectionId::new(id)),
        _ => None,
    })
}

pub(crate) fn lookup_loop<'a>(
    flow: &'a CompiledFlow,
    loop_name: &str,
) -> Result<&'a CollectionLoopConfig, NavigationError> {
    flow.collection_loop(loop_name)
        .ok_or_else(|| NavigationError::UnknownLoop {
            loop_name: loop_name.to_string(),
        })
}

pub(crate) fn lookup_subcategory<'a>(
    flow: &'a CompiledFlow,
    route: &str,
) -> Result<&'a SubcategoryConfig, NavigationError> {
    flow.subcategory(route)
        .ok_or_else(|| NavigationError::UnknownSubcategory {
            route: route.to_string(),
        })
}

pub(crate) fn ensure_member(
    store: &dyn FactStore,
    collection_loop: &CollectionLoopConfig,
    id: &CollectionId,
) -> Result<(), NavigationError> {
    let members = store.collection_items(&collection_loop.collection)?;
    if members.contains(id) {
        Ok(())
    } else {
        Err(NavigationError::UnknownCollectionItem {
            collection: collection_loop.collection.to_string(),
            id: id.clone(),
        })
    }
}

struct Step<'a> {
    screen: &'a ScreenConfig,
    collection_id: Option<CollectionId>,
}

impl Step<'_> {
    fn into_position(self) -> NavigationPosition {
        NavigationPosition {
            route: self.screen.route.clone(),
            collection_id: self.collection_id,
        }
    }

    fn into_destination(self) -> Destination {
        Destination::Screen(self.into_position())
    }
}

type ScreenFilter<'f> = &'f dyn Fn(&ScreenConfig) -> bool;

struct Router<'a> {
    flow: &'a CompiledFlow,
    store: &'a dyn FactStore,
}

impl<'a> Router<'a> {
    fn new(flow: &'a CompiledFlow, store: &'a dyn FactStore) -> Self {
        Self { flow, store }
    }

    fn resolve(&self, position: &NavigationPosition) -> Result<&'a ScreenConfig, NavigationError> {
        let screen = self
            .flow
            .screen(&position.route)
            .ok_or_else(|| NavigationError::UnknownRoute {
                route: position.route.clone(),
            })?;
        if let Some(collection_loop) = self.flow.loop_of(screen) {
            let Some(id) = &position.collection_id else {
                return Err(NavigationError::MissingCollectionId {
                    route: position.route.clone(),
                    loop_name: collection_loop.loop_name.clone(),
                });
            };
            ensure_member(self.store, collection_loop, id)?;
        }
        Ok(screen)
    }

    fn next(
        &self,
        current: &NavigationPosition,
        options: NavigationOptions,
    ) -> Result<Destination, NavigationError> {
        let screen = self.resolve(current)?;
        let id = current.collection_id.as_ref();
        let review = options.navigate_to_data_view_at_end_of_sub_subcategory;

        let mut next = None;
        let mut resume_at = screen.index + 1;
        if let Some(collection_loop) = self.flow.loop_of(screen) {
            let name = collection_loop.loop_name.as_str();
            let same_loop =
                |candidate: &ScreenConfig| candidate.collection_loop.as_deref() == Some(name);
            next = self.scan_forward(screen, id, screen.index + 1, &same_loop)?;
            if next.is_none()
                && let Some(id) = id
            {
                if collection_loop.auto_iterate {
                    next = self.next_item(collection_loop, id)?;
                } else if review {
                    return Ok(Destination::CollectionItemDataView {
                        loop_name: collection_loop.loop_name.clone(),
                        collection_id: id.clone(),
                    });
                }
            }
            resume_at = collection_loop.last_screen().unwrap_or(screen.index) + 1;
        }
        if next.is_none() {
            next = self.scan_forward(screen, id, resume_at, &|_: &ScreenConfig| true)?;
        }

        if let Some(step) = next.take_if(|step| step.screen.is_knockout) {
            return Ok(step.into_destination());
        }

        if review {
            let leaves_section = next.as_ref().is_none_or(|step| {
                step.screen.sub_subcategory_route != screen.sub_subcategory_route
            });
            if leaves_section {
                return self.end_of_section(screen, id);
            }
        }

        let Some(step) = next else {
            return Ok(Destination::Checklist);
        };
        if !options.return_to_checklist_at_end_of_subcategory
            || step.screen.subcategory_route == screen.subcategory_route
        {
            return Ok(step.into_destination());
        }
        match self.flow.subcategory(&screen.subcategory_route) {
            Some(subcategory) if self.returns_to_checklist(subcategory) => {
                Ok(Destination::Checklist)
            }
            _ => Ok(Destination::SubcategoryDataView {
                subcategory_route: screen.subcategory_route.clone(),
                section: None,
            }),
        }
    }

    /// Review mode reached the last screen of the current sub-subcategory.
    fn end_of_section(
        &self,
        screen: &'a ScreenConfig,
        id: Option<&CollectionId>,
    ) -> Result<Destination, NavigationError> {
        if screen.act_as_data_view {
            return Ok(Destination::Checklist);
        }
        // The same sub-subcategory may be split around other sections.
        if let Some(section_route) = screen.sub_subcategory_route.as_deref() {
            let same_section = |candidate: &ScreenConfig| {
                candidate.sub_subcategory_route.as_deref() == Some(section_route)
            };
            if let Some(step) = self.scan_forward(screen, id, screen.index + 1, &same_section)? {
                return Ok(step.into_destination());
            }
        }
        if let Some(collection_loop) = self.flow.loop_of(screen)
            && !collection_loop.auto_iterate
            && let Some(id) = id
        {
            return Ok(Destination::CollectionItemDataView {
                loop_name: collection_loop.loop_name.clone(),
                collection_id: id.clone(),
            });
        }
        let section = screen
            .sub_subcategory_route
            .as_deref()
            .and_then(|route| self.flow.sub_subcategory(route))
            .map(|section| section.section.clone());
        Ok(Destination::SubcategoryDataView {
            subcategory_route: screen.subcategory_route.clone(),
            section,
        })
    }

    fn returns_to_checklist(&self, subcategory: &SubcategoryConfig) -> bool {
        let has_data_view_screen = subcategory
            .screens
            .iter()
            .filter_map(|index| self.flow.screen_at(*index))
            .any(|screen| screen.act_as_data_view);
        has_data_view_screen
            || !subcategory.has_data_view()
            || (subcategory.collection_context.is_some()
                && !subcategory.collection_loops.is_empty())
    }

    fn previous(&self, current: &NavigationPosition) -> Result<Destination, NavigationError> {
        let screen = self.resolve(current)?;
        let id = current.collection_id.as_ref();

        let mut previous = None;
        let mut resume_at = screen.index.checked_sub(1);
        if let Some(collection_loop) = self.flow.loop_of(screen) {
            let name = collection_loop.loop_name.as_str();
            let same_loop =
                |candidate: &ScreenConfig| candidate.collection_loop.as_deref() == Some(name);
            previous = self.scan_backward(screen, id, screen.index.checked_sub(1), &same_loop)?;
            if previous.is_none()
                && collection_loop.auto_iterate
                && let Some(id) = id
            {
                previous = self.previous_item(collection_loop, id)?;
            }
            resume_at = collection_loop
                .first_screen()
                .unwrap_or(screen.index)
                .checked_sub(1);
        }
        if previous.is_none() {
            previous = self.scan_backward(screen, id, resume_at, &|_: &ScreenConfig| true)?;
        }
        Ok(previous.map_or(Destination::Checklist, Step::into_destination))
    }

    /// First routable screen at or after `start` accepted by `filter`.
    fn scan_forward(
        &self,
        origin: &ScreenConfig,
        origin_id: Option<&CollectionId>,
        start: ScreenIndex,
        filter: ScreenFilter<'_>,
    ) -> Result<Option<Step<'a>>, NavigationError> {
        let mut index = start;
        while let Some(screen) = self.flow.screen_at(index) {
            if !filter(screen) {
                index += 1;
                continue;
            }
            if let Some(collection_loop) = self.flow.loop_of(screen) {
                if let Some(id) = origin_id
                    && origin.collection_loop == screen.collection_loop
                {
                    if self.routable(screen, Some(id))? {
                        return Ok(Some(Step {
                            screen,
                            collection_id: Some(id.clone()),
                        }));
                    }
                    index += 1;
                    continue;
                }
                if let Some(step) = self.enter_loop_forward(collection_loop, screen)? {
                    return Ok(Some(step));
                }
                index = collection_loop.last_screen().unwrap_or(index).max(index) + 1;
                continue;
            }
            let id = self.carried_id(origin, origin_id, screen)?;
            if self.routable(screen, id.as_ref())? {
                return Ok(Some(Step {
                    screen,
                    collection_id: id,
                }));
            }
            index += 1;
        }
        Ok(None)
    }

    /// Last routable screen at or before `start` accepted by `filter`.
    fn scan_backward(
        &self,
        origin: &ScreenConfig,
        origin_id: Option<&CollectionId>,
        start: Option<ScreenIndex>,
        filter: ScreenFilter<'_>,
    ) -> Result<Option<Step<'a>>, NavigationError> {
        let mut cursor = start;
        while let Some(index) = cursor {
            let Some(screen) = self.flow.screen_at(index) else {
                break;
            };
            cursor = index.checked_sub(1);
            if !filter(screen) {
                continue;
            }
            if let Some(collection_loop) = self.flow.loop_of(screen) {
                if let Some(id) = origin_id
                    && origin.collection_loop == screen.collection_loop
                {
                    if self.routable(screen, Some(id))? {
                        return Ok(Some(Step {
                            screen,
                            collection_id: Some(id.clone()),
                        }));
                    }
                    continue;
                }
                if let Some(step) = self.enter_loop_backward(collection_loop, screen)? {
                    return Ok(Some(step));
                }
                cursor = collection_loop
                    .first_screen()
                    .unwrap_or(index)
                    .min(index)
                    .checked_sub(1);
                continue;
            }
            let id = self.carried_id(origin, origin_id, screen)?;
            if self.routable(screen, id.as_ref())? {
                return Ok(Some(Step {
                    screen,
                    collection_id: id,
                }));
            }
        }
        Ok(None)
    }

    fn enter_loop_forward(
        &self,
        collection_loop: &'a CollectionLoopConfig,
        entry: &ScreenConfig,
    ) -> Result<Option<Step<'a>>, NavigationError> {
        if !self.section_displayed(entry)? {
            return Ok(None);
        }
        let expansion = expand(collection_loop, self.flow, self.store)?;
        for item in expansion.navigable_items() {
            if let Some(screen) = item
                .routable_screens()
                .find(|screen| screen.index >= entry.index)
            {
                return Ok(Some(Step {
                    screen,
                    collection_id: Some(item.id.clone()),
                }));
            }
        }
        Ok(None)
    }

    fn enter_loop_backward(
        &self,
        collection_loop: &'a CollectionLoopConfig,
        entry: &ScreenConfig,
    ) -> Result<Option<Step<'a>>, NavigationError> {
        if !self.section_displayed(entry)? {
            return Ok(None);
        }
        let expansion = expand(collection_loop, self.flow, self.store)?;
        for item in expansion.navigable_items().into_iter().rev() {
            if let Some(screen) = item
                .routable_screens()
                .filter(|screen| screen.index <= entry.index)
                .last()
            {
                return Ok(Some(Step {
                    screen,
                    collection_id: Some(item.id.clone()),
                }));
            }
        }
        Ok(None)
    }

    /// First screen of the next member of an auto-iterating loop.
    fn next_item(
        &self,
        collection_loop: &'a CollectionLoopConfig,
        current: &CollectionId,
    ) -> Result<Option<Step<'a>>, NavigationError> {
        let expansion = expand(collection_loop, self.flow, self.store)?;
        let Some(position) = expansion.items.iter().position(|item| &item.id == current) else {
            return Ok(None);
        };
        for item in &expansion.items[position + 1..] {
            if let Some(screen) = item.routable_screens().next() {
                return Ok(Some(Step {
                    screen,
                    collection_id: Some(item.id.clone()),
                }));
            }
        }
        Ok(None)
    }

    /// Last screen of the previous member of an auto-iterating loop.
    fn previous_item(
        &self,
        collection_loop: &'a CollectionLoopConfig,
        current: &CollectionId,
    ) -> Result<Option<Step<'a>>, NavigationError> {
        let expansion = expand(collection_loop, self.flow, self.store)?;
        let Some(position) = expansion.items.iter().position(|item| &item.id == current) else {
            return Ok(None);
        };
        for item in expansion.items[..position].iter().rev() {
            if let Some(screen) = item.routable_screens().last() {
                return Ok(Some(Step {
                    screen,
                    collection_id: Some(item.id.clone()),
                }));
            }
        }
        Ok(None)
    }

    fn routable(
        &self,
        screen: &ScreenConfig,
        id: Option<&CollectionId>,
    ) -> Result<bool, NavigationError> {
        if !screen.route_automatically || !self.section_displayed(screen)? {
            return Ok(false);
        }
        Ok(screen.is_available(self.store, id)?)
    }

    fn section_displayed(&self, screen: &ScreenConfig) -> Result<bool, NavigationError> {
        let Some(subcategory) = self.flow.subcategory(&screen.subcategory_route) else {
            return Ok(true);
        };
        let id = context_collection_id(self.store, subcategory.collection_context.as_ref())?;
        Ok(subcategory.is_displayed(self.store, id.as_ref())?)
    }

    /// Collection id for a screen outside any loop.
    fn carried_id(
        &self,
        origin: &ScreenConfig,
        origin_id: Option<&CollectionId>,
        target: &ScreenConfig,
    ) -> Result<Option<CollectionId>, NavigationError> {
        let Some(context) = &target.collection_context else {
            return Ok(None);
        };
        if !origin.in_collection_loop()
            && origin.collection_context.as_ref() == Some(context)
            && let Some(id) = origin_id
        {
            return Ok(Some(id.clone()));
        }
        Ok(context_collection_id(self.store, Some(context))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_urls() {
        assert_eq!(Destination::Checklist.url(), "/checklist");
        assert_eq!(
            Destination::SubcategoryDataView {
                subcategory_route: "/flow/you/about".into(),
                section: Some("contact".into()),
            }
            .url(),
            "/data-view/flow/you/about#contact"
        );
        assert_eq!(
            Destination::CollectionItemDataView {
                loop_name: "/filers".into(),
                collection_id: CollectionId::new("a b"),
            }
            .url(),
            "/data-view/loop/%2Ffilers/a%20b"
        );
        assert_eq!(
            Destination::Screen(NavigationPosition::in_item("/flow/you/about/name", "x")).url(),
            "/flow/you/about/name?id=x"
        );
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: NavigationOptions =
            serde_json::from_str(r#"{"navigate_to_data_view_at_end_of_sub_subcategory": true}"#)
                .unwrap();
        assert_eq!(options, NavigationOptions::review());
    }
}
