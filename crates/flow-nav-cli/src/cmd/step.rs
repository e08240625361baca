use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use flow_nav::{CollectionId, Destination, NavigationPosition, next_screen, previous_screen};

use crate::cmd::{SourceArgs, print_json};
use crate::input;

#[derive(Args, Debug, Clone)]
pub struct StepArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Route of the current screen
    #[arg(long = "route", value_name = "ROUTE")]
    pub route: String,
    /// Collection item the current screen is shown for
    #[arg(long = "collection-id", value_name = "ID")]
    pub collection_id: Option<String>,
    /// Return to the section data view at the end of a sub-subcategory
    #[arg(long = "review", default_value_t = false)]
    pub review: bool,
    /// Return to the data view or checklist when leaving a subcategory
    #[arg(long = "checklist-at-subcategory-end", default_value_t = false)]
    pub checklist_at_subcategory_end: bool,
    /// Navigation options file; flags above are applied on top of it
    #[arg(long = "options", value_name = "options.toml")]
    pub options: Option<PathBuf>,
    #[arg(long = "json", default_value_t = false)]
    pub json: bool,
}

impl StepArgs {
    fn position(&self) -> NavigationPosition {
        NavigationPosition {
            route: self.route.clone(),
            collection_id: self.collection_id.clone().map(CollectionId::new),
        }
    }
}

pub fn run_next(args: &StepArgs) -> Result<()> {
    let (flow, store) = args.source.load()?;
    let mut options = input::load_options(args.options.as_deref())?;
    options.navigate_to_data_view_at_end_of_sub_subcategory |= args.review;
    options.return_to_checklist_at_end_of_subcategory |= args.checklist_at_subcategory_end;
    let destination = next_screen(&flow, &store, &args.position(), options)
        .with_context(|| format!("cannot step forward from {}", args.route))?;
    emit(&destination, args.json)
}

pub fn run_previous(args: &StepArgs) -> Result<()> {
    let (flow, store) = args.source.load()?;
    let destination = previous_screen(&flow, &store, &args.position())
        .with_context(|| format!("cannot step back from {}", args.route))?;
    emit(&destination, args.json)
}

fn emit(destination: &Destination, json: bool) -> Result<()> {
    if json {
        return print_json(destination);
    }
    println!("{}", destination.url());
    Ok(())
}
