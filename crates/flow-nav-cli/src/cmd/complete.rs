use anyhow::Result;
use clap::Args;
use serde::Serialize;

use flow_nav::{NavigationPosition, first_incomplete_screen, is_subcategory_complete};

use crate::cmd::{SourceArgs, print_json};

#[derive(Args, Debug, Clone)]
pub struct CompleteArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Subcategory route, e.g. /flow/you/about
    #[arg(long = "subcategory", value_name = "ROUTE")]
    pub subcategory: String,
    #[arg(long = "json", default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct CompletionReport {
    subcategory: String,
    is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    resume_at: Option<NavigationPosition>,
}

pub fn run(args: &CompleteArgs) -> Result<()> {
    let (flow, store) = args.source.load()?;
    let report = CompletionReport {
        subcategory: args.subcategory.clone(),
        is_complete: is_subcategory_complete(&flow, &store, &args.subcategory)?,
        resume_at: first_incomplete_screen(&flow, &store, &args.subcategory)?,
    };
    if args.json {
        return print_json(&report);
    }
    let state = if report.is_complete {
        "complete"
    } else {
        "incomplete"
    };
    println!("{}: {state}", report.subcategory);
    if let Some(position) = &report.resume_at {
        match &position.collection_id {
            Some(id) => println!("resume at {} (item {id})", position.route),
            None => println!("resume at {}", position.route),
        }
    }
    Ok(())
}
