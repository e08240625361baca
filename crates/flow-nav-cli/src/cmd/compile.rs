use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use flow_nav::CompiledFlow;

use crate::cmd::print_json;
use crate::input;

#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    #[arg(long = "flow", value_name = "flow.json")]
    pub flow: PathBuf,
    #[arg(long = "dictionary", value_name = "paths.json")]
    pub dictionary: Option<PathBuf>,
    /// Print the full compiled structure instead of a summary
    #[arg(long = "dump", default_value_t = false)]
    pub dump: bool,
    #[arg(long = "json", default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct CompileSummary<'a> {
    id: &'a str,
    categories: usize,
    subcategories: usize,
    screens: usize,
    collection_loops: Vec<&'a str>,
    fact_paths: usize,
}

impl<'a> CompileSummary<'a> {
    fn new(flow: &'a CompiledFlow) -> Self {
        Self {
            id: flow.id(),
            categories: flow.categories().len(),
            subcategories: flow.subcategories().count(),
            screens: flow.screens().len(),
            collection_loops: flow
                .collection_loops()
                .map(|collection_loop| collection_loop.loop_name.as_str())
                .collect(),
            fact_paths: flow.fact_index().len(),
        }
    }
}

pub fn run(args: &CompileArgs) -> Result<()> {
    let flow = input::load_flow(&args.flow, args.dictionary.as_deref())?;
    if args.dump {
        return print_json(&flow);
    }
    let summary = CompileSummary::new(&flow);
    if args.json {
        return print_json(&summary);
    }
    println!("flow {} compiled", summary.id);
    println!("  categories: {}", summary.categories);
    println!("  subcategories: {}", summary.subcategories);
    println!("  screens: {}", summary.screens);
    if !summary.collection_loops.is_empty() {
        println!("  collection loops: {}", summary.collection_loops.join(", "));
    }
    println!("  fact paths: {}", summary.fact_paths);
    Ok(())
}
