//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for the kidlearn audio engine.
#[derive(Parser)]
#[command(name = "kidlearn")]
#[command(about = "Generate and try out kidlearn narration audio")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Audio engine configuration (JSON)
    #[arg(long, global = true, env = "KIDLEARN_AUDIO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Clip location: a directory or an http(s) base URL
    #[arg(long, global = true, env = "KIDLEARN_CLIPS")]
    pub clips: Option<String>,

    /// Run without an output device or speech synthesizer
    #[arg(long, global = true)]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from(["kidlearn", "--verbose", "--clips", "/tmp/audio", "tones"]);
        assert!(cli.verbose);
        assert_eq!(cli.clips.as_deref(), Some("/tmp/audio"));
        assert!(matches!(cli.command, Some(Commands::Tones)));
    }
}
