//! Subcommands of the `kidlearn` binary.

use std::path::PathBuf;

use clap::Subcommand;

/// Default ElevenLabs voice ("Lily", gentle and clear for children).
pub const DEFAULT_VOICE_ID: &str = "pFZP5JQG7iQjIQuC4Bku";
/// Default ElevenLabs model.
pub const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Render every clip of the manifest with ElevenLabs
    GenerateClips {
        /// Output directory for the `<key>.mp3` files
        #[arg(long, default_value = "public/audio")]
        out: PathBuf,
        /// ElevenLabs voice ID
        #[arg(long, env = "ELEVENLABS_VOICE_ID", default_value = DEFAULT_VOICE_ID)]
        voice: String,
        /// ElevenLabs API key (not needed with `--dry-run`)
        #[arg(long, env = "ELEVENLABS_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
        /// JSON object of extra or replacement `key: text` entries
        #[arg(long)]
        manifest: Option<PathBuf>,
        /// Pause between requests, in milliseconds
        #[arg(long, default_value_t = 550)]
        delay_ms: u64,
        /// ElevenLabs model ID
        #[arg(long, default_value = DEFAULT_MODEL_ID)]
        model: String,
        /// Only print the manifest
        #[arg(long)]
        dry_run: bool,
    },

    /// Play one prompt through the narrator
    Say {
        #[command(subcommand)]
        what: SayCommand,
    },

    /// Count out loud from 1 to N
    Count {
        /// Number to count to
        #[arg(default_value_t = 5)]
        n: u32,
    },

    /// Play the background music loop
    Music {
        /// How long to play before fading out
        #[arg(long, default_value_t = 20)]
        seconds: u64,
    },

    /// Play every sound effect once
    Tones,
}

/// What `say` plays.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SayCommand {
    /// A letter name, e.g. `B`
    Letter { letter: String },
    /// A word, e.g. `GATO`
    Word { word: String },
    /// A letter followed by "de <word>"
    LetterWord { letter: String, word: String },
    /// A number name, or the bare numeral with `--bare`
    Number {
        n: u32,
        #[arg(long)]
        bare: bool,
    },
    /// Any clip key, with text to speak if the clip is missing
    Phrase { key: String, fallback: String },
    /// Positive feedback
    Correct,
    /// "Try again" feedback
    TryAgain,
    /// Celebration fanfare and phrase
    Celebrate,
}
