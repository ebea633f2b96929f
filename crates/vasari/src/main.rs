//! Vasari CLI binary.
//!
//! This binary provides command-line access to the completion pipeline:
//! - Run a completion, optionally with images or a response schema
//! - Look up model pricing

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, run_complete, show_pricing};

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    vasari::init_telemetry(cli.log_format, level)?;

    match cli.command {
        Commands::Complete(args) => run_complete(args).await?,
        Commands::Pricing { model, provider } => show_pricing(&model, provider).await?,
    }

    Ok(())
}
