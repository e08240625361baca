use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::{
    self, alerts::AlertsArgs, checklist::ChecklistArgs, compile::CompileArgs,
    complete::CompleteArgs, step::StepArgs,
};

/// Environment variable holding the log filter, e.g. `FLOW_NAV_LOG=flow_nav=trace`.
const LOG_ENV: &str = "FLOW_NAV_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "flow-nav",
    about = "Inspect flow definitions and step through them against a fact snapshot",
    version,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Log filter used when FLOW_NAV_LOG is unset
    #[arg(long = "log", value_name = "FILTER", global = true, default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a flow definition and summarize its structure
    Compile(CompileArgs),
    /// Compute where "continue" leads from a screen
    Next(StepArgs),
    /// Compute where "back" leads from a screen
    Previous(StepArgs),
    /// Report completion of a subcategory and where to resume it
    Complete(CompleteArgs),
    /// Render the checklist for a fact snapshot
    Checklist(ChecklistArgs),
    /// List the active alerts under a screen or section
    Alerts(AlertsArgs),
    /// Print the JSON schema of flow definition files
    Schema,
}

pub fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log);
    match cli.command {
        Commands::Compile(args) => cmd::compile::run(&args),
        Commands::Next(args) => cmd::step::run_next(&args),
        Commands::Previous(args) => cmd::step::run_previous(&args),
        Commands::Complete(args) => cmd::complete::run(&args),
        Commands::Checklist(args) => cmd::checklist::run(&args),
        Commands::Alerts(args) => cmd::alerts::run(&args),
        Commands::Schema => cmd::schema::run(),
    }
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    // A subscriber may already be installed when embedded in tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
