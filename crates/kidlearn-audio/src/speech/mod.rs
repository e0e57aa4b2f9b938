//! Speech fallback engine, used when no pre-rendered clip exists.
//!
//! This module defines the [`SpeechSynthesizer`] port over the platform's
//! text-to-speech, the rule-based [`VoiceSelector`] and the serialized
//! [`SpeechQueue`] that guarantees at most one utterance is audible at a
//! time.
//!
//! ## Synthesizer implementations
//!
//! | Type | Backing |
//! |------|---------|
//! | [`EspeakSynthesizer`] | `espeak-ng` child process |
//! | [`NoSpeech`] | none; every utterance resolves immediately |

pub mod espeak;
pub mod queue;
pub mod voices;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::AudioError;

pub use espeak::EspeakSynthesizer;
pub use queue::{SpeechOutcome, SpeechQueue, SpeechTicket};
pub use voices::{VoiceRule, VoiceSelector};

// ── Shared types ───────────────────────────────────────────────────

/// One request to speak text.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utterance {
    pub text: String,

    /// Speaking rate, 1.0 is the platform default.
    pub rate: f32,

    /// Pitch multiplier, 1.0 is the platform default.
    pub pitch: f32,

    /// BCP-47 language tag, e.g. `es-US`.
    pub lang: String,
}

impl Utterance {
    #[must_use]
    pub fn new(text: impl Into<String>, rate: f32, pitch: f32, lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rate,
            pitch,
            lang: lang.into(),
        }
    }
}

/// A voice installed on the platform.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemVoice {
    /// Identifier passed back to the synthesizer.
    pub id: String,

    /// Human-readable name, matched by [`VoiceRule`]s.
    pub name: String,

    /// BCP-47 language tag.
    pub lang: String,
}

// ── Synthesizer port ───────────────────────────────────────────────

/// Platform text-to-speech.
///
/// The voice list may load lazily: [`voices`](Self::voices) returns whatever
/// is known right now and [`subscribe_voices`](Self::subscribe_voices)
/// yields a generation counter that increments every time the list changes.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Whether the platform has any speech capability at all.
    fn is_available(&self) -> bool;

    /// Voices known right now. May be empty while the list is loading.
    fn voices(&self) -> Vec<SystemVoice>;

    /// Generation counter of the voice list.
    fn subscribe_voices(&self) -> watch::Receiver<u64>;

    /// Speak one utterance, resolving when it finishes or fails.
    ///
    /// `voice = None` uses the platform default for `utterance.lang`.
    async fn speak(&self, utterance: &Utterance, voice: Option<&SystemVoice>)
    -> Result<(), AudioError>;

    /// Stop whatever is being spoken. The pending `speak` call resolves.
    fn cancel(&self);
}

/// Synthesizer for platforms without speech. Every call resolves at once.
#[derive(Debug)]
pub struct NoSpeech {
    generation: watch::Sender<u64>,
}

impl NoSpeech {
    #[must_use]
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self { generation }
    }
}

impl Default for NoSpeech {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSynthesizer for NoSpeech {
    fn is_available(&self) -> bool {
        false
    }

    fn voices(&self) -> Vec<SystemVoice> {
        Vec::new()
    }

    fn subscribe_voices(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    async fn speak(
        &self,
        utterance: &Utterance,
        _voice: Option<&SystemVoice>,
    ) -> Result<(), AudioError> {
        tracing::debug!(text = %utterance.text, "No speech synthesizer, skipping utterance");
        Ok(())
    }

    fn cancel(&self) {}
}
