//! Command-line front-end for the kidlearn audio engine.
//!
//! `kidlearn generate-clips` renders the clip manifest through the
//! ElevenLabs text-to-speech API; the other subcommands drive the
//! [`kidlearn_audio::Narrator`] for manual listening tests.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by the binary only
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod elevenlabs;
pub mod error;
pub mod handlers;
pub mod manifest;
pub mod parser;

// Re-export primary types for convenient access
pub use bootstrap::{CliConfig, bootstrap};
pub use commands::{Commands, SayCommand};
pub use elevenlabs::{ClipSynthesizer, ElevenLabsClient, VoiceSettings};
pub use error::GenerateError;
pub use manifest::Manifest;
pub use parser::Cli;
