//! Temario CLI binary.
//!
//! This binary drives syllabus generation from the command line:
//! - Generate topics for an assistant
//! - Repair topics left broken by earlier runs
//! - Inspect and purge stored topics

use clap::Parser;
use temario::{ObservabilityConfig, Services, TemarioConfig, init_observability};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, run_generate, run_purge, run_repair, run_status};

    // Environment from .env before anything reads it
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    init_observability(
        &ObservabilityConfig::new()
            .with_verbose(cli.verbose)
            .with_json_logs(cli.json_logs),
    )?;

    let config = TemarioConfig::load(cli.config.as_deref())?;
    let services = Services::from_config(config)?;

    match cli.command {
        Commands::Generate {
            assistant,
            topics,
            topics_file,
            format,
        } => {
            run_generate(&services, &assistant, topics, topics_file.as_deref(), format).await?;
        }

        Commands::Repair { assistant, format } => {
            run_repair(&services, &assistant, format).await?;
        }

        Commands::Status { assistant, format } => {
            run_status(&services, &assistant, format).await?;
        }

        Commands::Purge {
            assistant,
            slug,
            format,
        } => {
            run_purge(&services, &assistant, &slug, format).await?;
        }
    }

    Ok(())
}
