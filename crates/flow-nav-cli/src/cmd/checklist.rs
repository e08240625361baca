use anyhow::Result;
use clap::Args;

use flow_nav::{ChecklistOptions, ChecklistSubcategory, checklist};

use crate::cmd::{SourceArgs, print_json};

#[derive(Args, Debug, Clone)]
pub struct ChecklistArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Category routes to leave out; defaults to the knockout category
    #[arg(long = "exclude", value_name = "ROUTE")]
    pub exclude: Vec<String>,
    /// Show every category, including the knockout one
    #[arg(long = "all", default_value_t = false, conflicts_with = "exclude")]
    pub all: bool,
    #[arg(long = "json", default_value_t = false)]
    pub json: bool,
}

impl ChecklistArgs {
    fn options(&self) -> ChecklistOptions {
        if self.all {
            ChecklistOptions {
                excluded_categories: Vec::new(),
            }
        } else if self.exclude.is_empty() {
            ChecklistOptions::default()
        } else {
            ChecklistOptions {
                excluded_categories: self.exclude.clone(),
            }
        }
    }
}

pub fn run(args: &ChecklistArgs) -> Result<()> {
    let (flow, store) = args.source.load()?;
    let categories = checklist(&flow, &store, &args.options())?;
    if args.json {
        return print_json(&categories);
    }
    for category in &categories {
        println!("{}", category.route);
        for subcategory in &category.subcategories {
            println!("  [{}] {}", marker(subcategory), subcategory.route);
            if let Some(destination) = &subcategory.destination {
                println!("      -> {}", destination.url());
            }
            for alert in subcategory
                .alerts
                .errors
                .iter()
                .chain(&subcategory.alerts.warnings)
            {
                println!("      ! {:?} {}", alert.level, alert.i18n_key);
            }
        }
    }
    Ok(())
}

fn marker(subcategory: &ChecklistSubcategory) -> char {
    if subcategory.is_complete {
        'x'
    } else if subcategory.is_started_but_not_complete {
        '~'
    } else if subcategory.is_next {
        '>'
    } else {
        ' '
    }
}
