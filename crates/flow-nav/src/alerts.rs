use serde::Serialize;

use crate::condition::{ConditionError, all_pass};
use crate::facts::FactStore;
use crate::flow::{CompiledFlow, ScreenConfig, ScreenIndex};
use crate::path::{CollectionId, FactPath};
use crate::router::{NavigationError, context_collection_id, ensure_member, lookup_loop};
use crate::spec::{AlertAggregatorType, AlertLevel, AlertSpec};

/// An alert whose conditions currently hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub i18n_key: String,
    pub route: String,
    pub subcategory_route: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_subcategory_route: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<CollectionId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fact_paths: Vec<FactPath>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertSummary {
    pub errors: Vec<Alert>,
    pub warnings: Vec<Alert>,
}

impl AlertSummary {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len() + self.warnings.len()
    }

    pub fn push(&mut self, alert: Alert) {
        match alert.level {
            AlertLevel::Error => self.errors.push(alert),
            AlertLevel::Warning => self.warnings.push(alert),
        }
    }

    /// Alerts raised under one sub-subcategory, keeping their order.
    pub fn for_sub_subcategory(&self, route: &str) -> AlertSummary {
        let keep = |alert: &&Alert| alert.sub_subcategory_route.as_deref() == Some(route);
        AlertSummary {
            errors: self.errors.iter().filter(keep).cloned().collect(),
            warnings: self.warnings.iter().filter(keep).cloned().collect(),
        }
    }
}

/// Collects the active alerts under `route`.
///
/// With [`AlertAggregatorType::Screen`], `route` names a screen; a loop screen
/// without `collection_id` is walked for every member, and with one the id must
/// be a member of the loop's collection. With [`AlertAggregatorType::Sections`],
/// `route` names a subcategory or sub-subcategory: plain screens come first,
/// then each loop member by member in collection order. There `collection_id`
/// narrows only the loops whose collection holds it.
pub fn collect_alerts(
    flow: &CompiledFlow,
    store: &dyn FactStore,
    route: &str,
    scope: AlertAggregatorType,
    collection_id: Option<&CollectionId>,
) -> Result<AlertSummary, NavigationError> {
    let mut summary = AlertSummary::default();
    match scope {
        AlertAggregatorType::Screen => {
            let screen = flow
                .screen(route)
                .ok_or_else(|| NavigationError::UnknownRoute {
                    route: route.to_string(),
                })?;
            match (flow.loop_of(screen), collection_id) {
                (Some(collection_loop), Some(id)) => {
                    ensure_member(store, collection_loop, id)?;
                    collect_screen(screen, store, Some(id), &mut summary)?;
                }
                (None, Some(id)) if screen.collection_context.is_some() => {
                    collect_screen(screen, store, Some(id), &mut summary)?;
                }
                _ => collect_screens(flow, store, &[screen.index], None, &mut summary)?,
            }
        }
        AlertAggregatorType::Sections => {
            let screens = if let Some(subcategory) = flow.subcategory(route) {
                &subcategory.screens
            } else if let Some(sub_subcategory) = flow.sub_subcategory(route) {
                &sub_subcategory.screens
            } else {
                return Err(NavigationError::UnknownSubcategory {
                    route: route.to_string(),
                });
            };
            collect_screens(flow, store, screens, collection_id, &mut summary)?;
        }
    }
    Ok(summary)
}

fn collect_screens(
    flow: &CompiledFlow,
    store: &dyn FactStore,
    indices: &[ScreenIndex],
    collection_id: Option<&CollectionId>,
    summary: &mut AlertSummary,
) -> Result<(), NavigationError> {
    let screens: Vec<&ScreenConfig> = indices
        .iter()
        .filter_map(|index| flow.screen_at(*index))
        .collect();

    for screen in screens.iter().filter(|screen| !screen.in_collection_loop()) {
        let id = context_collection_id(store, screen.collection_context.as_ref())?;
        collect_screen(screen, store, id.as_ref(), summary)?;
    }

    let mut loop_names: Vec<&str> = Vec::new();
    for name in screens
        .iter()
        .filter_map(|screen| screen.collection_loop.as_deref())
    {
        if !loop_names.contains(&name) {
            loop_names.push(name);
        }
    }
    for name in loop_names {
        let collection_loop = lookup_loop(flow, name)?;
        let mut ids = store.collection_items(&collection_loop.collection)?;
        if let Some(id) = collection_id
            && ids.contains(id)
        {
            ids = vec![id.clone()];
        }
        for id in &ids {
            for screen in screens
                .iter()
                .filter(|screen| screen.collection_loop.as_deref() == Some(name))
            {
                collect_screen(screen, store, Some(id), summary)?;
            }
        }
    }
    Ok(())
}

fn collect_screen(
    screen: &ScreenConfig,
    store: &dyn FactStore,
    id: Option<&CollectionId>,
    summary: &mut AlertSummary,
) -> Result<(), NavigationError> {
    for alert in screen.alerts() {
        if all_pass(&alert.conditions, store, id)? {
            summary.push(build_alert(screen, alert, id)?);
        }
    }
    Ok(())
}

fn build_alert(
    screen: &ScreenConfig,
    alert: &AlertSpec,
    id: Option<&CollectionId>,
) -> Result<Alert, ConditionError> {
    let fact_paths = alert
        .fact_paths
        .iter()
        .map(|path| {
            path.concretize(id)
                .map(FactPath::from)
                .map_err(|_| ConditionError::MissingCollectionId {
                    path: path.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Alert {
        level: alert.level,
        i18n_key: alert.i18n_key.clone(),
        route: screen.route.clone(),
        subcategory_route: screen.subcategory_route.clone(),
        sub_subcategory_route: screen.sub_subcategory_route.clone(),
        loop_name: screen.collection_loop.clone(),
        collection_id: id.cloned(),
        fact_paths,
    })
}
