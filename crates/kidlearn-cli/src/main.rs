//! CLI entry point - the composition root.
//!
//! `generate-clips` only needs the HTTP client; every other command runs
//! through a [`kidlearn_audio::Narrator`] built by [`bootstrap`].

use std::time::Duration;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use kidlearn_cli::handlers::generate::GenerateArgs;
use kidlearn_cli::{Cli, CliConfig, Commands, bootstrap, handlers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables; .env.local wins over .env
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Dispatch to appropriate handler
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = CliConfig {
        config_path: cli.config,
        clips: cli.clips,
        silent: cli.silent,
    };

    match command {
        Commands::GenerateClips {
            out,
            voice,
            api_key,
            manifest,
            delay_ms,
            model,
            dry_run,
        } => {
            let args = GenerateArgs {
                out,
                voice,
                api_key,
                manifest,
                delay: Duration::from_millis(delay_ms),
                model,
                dry_run,
            };
            handlers::generate::execute(args).await?;
        }
        Commands::Say { what } => {
            let narrator = bootstrap(&config)?;
            handlers::say::execute(&narrator, what).await?;
        }
        Commands::Count { n } => {
            let narrator = bootstrap(&config)?;
            handlers::count::execute(&narrator, n).await?;
        }
        Commands::Music { seconds } => {
            let narrator = bootstrap(&config)?;
            handlers::music::execute(&narrator, seconds).await?;
        }
        Commands::Tones => {
            let narrator = bootstrap(&config)?;
            handlers::tones::execute(&narrator).await?;
        }
    }

    Ok(())
}
