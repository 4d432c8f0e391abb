mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{run, status};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn setup_logging(verbose: u8) -> anyhow::Result<()> {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

pub fn dispatch() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    setup_logging(cli.verbose)?;
    match &cli.command {
        Commands::Run(args) => run::run(&cli, args),
        Commands::Status(args) => status::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { dispatch() }
