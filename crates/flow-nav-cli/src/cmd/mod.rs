pub mod alerts;
pub mod checklist;
pub mod compile;
pub mod complete;
pub mod schema;
pub mod step;

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use flow_nav::{CompiledFlow, InMemoryFactStore};

use crate::input;

/// Flow definition plus the fact snapshot to evaluate it against.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Flow definition (JSON, or TOML with a .toml extension)
    #[arg(long = "flow", value_name = "flow.json")]
    pub flow: PathBuf,
    /// Fact snapshot keyed by concrete path; empty when omitted
    #[arg(long = "facts", value_name = "facts.json")]
    pub facts: Option<PathBuf>,
    /// Reject fact paths missing from this JSON array of paths
    #[arg(long = "dictionary", value_name = "paths.json")]
    pub dictionary: Option<PathBuf>,
}

impl SourceArgs {
    pub fn load(&self) -> Result<(CompiledFlow, InMemoryFactStore)> {
        let flow = input::load_flow(&self.flow, self.dictionary.as_deref())?;
        let store = input::load_facts(self.facts.as_deref())?;
        Ok((flow, store))
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
