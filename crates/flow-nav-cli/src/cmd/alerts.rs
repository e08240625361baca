use anyhow::Result;
use clap::{Args, ValueEnum};

use flow_nav::{AlertAggregatorType, CollectionId, collect_alerts};

use crate::cmd::{SourceArgs, print_json};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeArg {
    /// A single screen
    Screen,
    /// A subcategory or sub-subcategory
    Sections,
}

impl From<ScopeArg> for AlertAggregatorType {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Screen => AlertAggregatorType::Screen,
            ScopeArg::Sections => AlertAggregatorType::Sections,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct AlertsArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[arg(long = "route", value_name = "ROUTE")]
    pub route: String,
    #[arg(long = "scope", value_enum, default_value = "screen")]
    pub scope: ScopeArg,
    /// Restrict loop screens to one collection item
    #[arg(long = "collection-id", value_name = "ID")]
    pub collection_id: Option<String>,
    #[arg(long = "json", default_value_t = false)]
    pub json: bool,
}

pub fn run(args: &AlertsArgs) -> Result<()> {
    let (flow, store) = args.source.load()?;
    let collection_id = args.collection_id.clone().map(CollectionId::new);
    let summary = collect_alerts(
        &flow,
        &store,
        &args.route,
        args.scope.into(),
        collection_id.as_ref(),
    )?;
    if args.json {
        return print_json(&summary);
    }
    if summary.is_empty() {
        println!("no active alerts");
        return Ok(());
    }
    for alert in summary.errors.iter().chain(&summary.warnings) {
        let item = alert
            .collection_id
            .as_ref()
            .map(|id| format!(" [{id}]"))
            .unwrap_or_default();
        println!("{:?} {} at {}{item}", alert.level, alert.i18n_key, alert.route);
    }
    Ok(())
}
