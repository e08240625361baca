mod cli;
mod cmd;
mod input;

fn main() -> anyhow::Result<()> {
    cli::main()
}
