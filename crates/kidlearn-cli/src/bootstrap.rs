//! CLI bootstrap - the composition root.
//!
//! Loads the audio configuration and assembles the [`Narrator`]. When the
//! sound output cannot be opened the narrator still runs over a silent
//! device, so speech-only checks keep working on headless machines.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use kidlearn_audio::{
    AudioConfig, EspeakSynthesizer, Narrator, NoSpeech, SilentDevice, clip_source_for,
};

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// JSON file with an [`AudioConfig`].
    pub config_path: Option<PathBuf>,
    /// Overrides the configured clip location.
    pub clips: Option<String>,
    /// Skip the output device and the synthesizer entirely.
    pub silent: bool,
}

impl CliConfig {
    /// Read the audio configuration, applying command-line overrides.
    pub fn audio_config(&self) -> Result<AudioConfig> {
        let mut config = match &self.config_path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                AudioConfig::from_json(&text)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => AudioConfig::default(),
        };
        if let Some(clips) = &self.clips {
            config.clips.location.clone_from(clips);
        }
        Ok(config)
    }
}

/// Build the narrator for playback commands.
pub fn bootstrap(config: &CliConfig) -> Result<Arc<Narrator>> {
    let audio = config.audio_config()?;

    if config.silent {
        tracing::info!("Running silent");
        let source = clip_source_for(&audio.clips.location);
        return Ok(Narrator::new(
            SilentDevice::shared(),
            source,
            Arc::new(NoSpeech::new()),
            audio,
        ));
    }

    match Narrator::open(audio.clone()) {
        Ok(narrator) => {
            narrator.init();
            Ok(narrator)
        }
        Err(e) => {
            tracing::warn!(error = %e, "No sound output, continuing with speech only");
            let source = clip_source_for(&audio.clips.location);
            let synth = EspeakSynthesizer::spawn(audio.speech.program.clone());
            Ok(Narrator::new(SilentDevice::shared(), source, synth, audio))
        }
    }
}
