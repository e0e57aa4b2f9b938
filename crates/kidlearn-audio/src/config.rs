//! Engine configuration.
//!
//! Every section implements [`Default`] with the values the game ships with,
//! and deserializes with `#[serde(default)]` so a config file only needs to
//! name the fields it overrides.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AudioError;
use crate::speech::VoiceRule;

/// Top-level configuration for the audio engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Pre-rendered clip loading.
    pub clips: ClipConfig,

    /// Speech fallback engine.
    pub speech: SpeechConfig,

    /// Background music scheduler.
    pub music: MusicConfig,

    /// Count sequence pacing.
    pub count: CountConfig,
}

impl AudioConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json(text: &str) -> Result<Self, AudioError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| AudioError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot schedule with.
    pub fn validate(&self) -> Result<(), AudioError> {
        self.music.validate()
    }
}

// ── Clips ──────────────────────────────────────────────────────────

/// Configuration for the clip cache and loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    /// Where clips live: an `http(s)://` base URL or a local directory.
    pub location: String,

    /// Per-attempt fetch timeout (ms, default 8000).
    pub fetch_timeout_ms: u64,

    /// Decode timeout (ms, default 4000).
    pub decode_timeout_ms: u64,

    /// Extra attempts for transient failures (default 1).
    ///
    /// Missing assets and decode failures are never retried.
    pub max_retries: u32,

    /// Delay before the first retry (ms, default 250); doubles per attempt.
    pub retry_backoff_ms: u64,

    /// Playback volume for clips (0.0–1.0, default 1.0).
    pub volume: f32,
}

impl ClipConfig {
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub const fn decode_timeout(&self) -> Duration {
        Duration::from_millis(self.decode_timeout_ms)
    }

    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            location: "public/audio".to_string(),
            fetch_timeout_ms: 8_000,
            decode_timeout_ms: 4_000,
            max_retries: 1,
            retry_backoff_ms: 250,
            volume: 1.0,
        }
    }
}

// ── Speech ─────────────────────────────────────────────────────────

/// Configuration for the speech fallback engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// BCP-47 language tag requested for every utterance.
    pub lang: String,

    /// Voice selection rules, evaluated in order; first match wins.
    pub voice_rules: Vec<VoiceRule>,

    /// How long to wait for the platform voice list to load (ms, default 2000).
    pub voice_wait_ms: u64,

    /// Fixed part of the per-utterance timeout (ms, default 3000).
    pub timeout_base_ms: u64,

    /// Per-character part of the per-utterance timeout (ms, default 150).
    pub timeout_per_char_ms: u64,

    /// Synthesizer executable for the process-backed engine.
    pub program: String,
}

impl SpeechConfig {
    pub const fn voice_wait(&self) -> Duration {
        Duration::from_millis(self.voice_wait_ms)
    }

    /// Upper bound on how long one utterance may take before the queue
    /// gives up on it and moves on.
    pub fn utterance_timeout(&self, text: &str) -> Duration {
        let chars = u64::try_from(text.chars().count()).unwrap_or(u64::MAX);
        Duration::from_millis(
            self.timeout_base_ms
                .saturating_add(self.timeout_per_char_ms.saturating_mul(chars)),
        )
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            lang: "es-US".to_string(),
            voice_rules: VoiceRule::spanish_defaults(),
            voice_wait_ms: 2_000,
            timeout_base_ms: 3_000,
            timeout_per_char_ms: 150,
            program: "espeak-ng".to_string(),
        }
    }
}

// ── Music ──────────────────────────────────────────────────────────

/// Configuration for the background music scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicConfig {
    /// Bus gain at full volume (default 0.85).
    pub target_gain: f32,

    /// Fade from silence to `target_gain` on start (seconds, default 3.0).
    pub fade_in_secs: f64,

    /// Fade to silence on stop (seconds, default 1.5).
    pub fade_out_secs: f64,

    /// Delay after stop before the bus is released (seconds, default 2.0).
    pub release_after_secs: f64,

    /// Offset of the first pass from the start call (seconds, default 0.2).
    pub lead_in_secs: f64,

    /// How far ahead of the end of a pass the next one is scheduled
    /// (seconds, default 0.3).
    pub look_ahead_secs: f64,

    /// Minimum delay between scheduling passes (ms, default 200).
    pub min_rearm_ms: u64,

    /// Probability that a melody note gets a bass undertone (default 0.45).
    pub bass_probability: f64,

    /// Ramp time for volume changes (seconds, default 0.4).
    pub volume_ramp_secs: f64,

    /// Fixed RNG seed for the bass pattern; random when unset.
    pub seed: Option<u64>,
}

impl MusicConfig {
    /// Times must be finite and non-negative, the bass probability within
    /// `0..=1`.
    pub fn validate(&self) -> Result<(), AudioError> {
        let times = [
            ("fade_in_secs", self.fade_in_secs),
            ("fade_out_secs", self.fade_out_secs),
            ("release_after_secs", self.release_after_secs),
            ("lead_in_secs", self.lead_in_secs),
            ("look_ahead_secs", self.look_ahead_secs),
            ("volume_ramp_secs", self.volume_ramp_secs),
            ("target_gain", f64::from(self.target_gain)),
        ];
        for (name, value) in times {
            if !value.is_finite() || value < 0.0 {
                return Err(AudioError::InvalidConfig(format!(
                    "music.{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.bass_probability) {
            return Err(AudioError::InvalidConfig(format!(
                "music.bass_probability must be within 0..=1, got {}",
                self.bass_probability
            )));
        }
        Ok(())
    }
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            target_gain: 0.85,
            fade_in_secs: 3.0,
            fade_out_secs: 1.5,
            release_after_secs: 2.0,
            lead_in_secs: 0.2,
            look_ahead_secs: 0.3,
            min_rearm_ms: 200,
            bass_probability: 0.45,
            volume_ramp_secs: 0.4,
            seed: None,
        }
    }
}

// ── Count sequence ─────────────────────────────────────────────────

/// Pacing of the narrated count sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CountConfig {
    /// Delay before the first step (ms, default 150).
    pub initial_delay_ms: u64,

    /// Pause after each spoken numeral (ms, default 100).
    pub breath_ms: u64,
}

impl CountConfig {
    pub const fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub const fn breath(&self) -> Duration {
        Duration::from_millis(self.breath_ms)
    }
}

impl Default for CountConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 150,
            breath_ms: 100,
        }
    }
}
