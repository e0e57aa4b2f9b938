//! Narration and sound engine for the kidlearn games.
//!
//! Every spoken prompt prefers a pre-rendered clip and falls back to the
//! platform speech synthesizer; effects and background music are
//! synthesized on the fly. The [`Narrator`] façade ties the parts together:
//!
//! | Module | Role |
//! |--------|------|
//! | [`device`] | Audio device port, tones, gain automation |
//! | [`audio_thread`] | rodio output on a dedicated thread |
//! | [`tones`] | Sound-effect plans (sparkle, wrong, count blip, celebration) |
//! | [`clips`] | Clip sources and the session clip cache |
//! | [`speech`] | Synthesizer port, voice selection, serialized queue |
//! | [`music`] | Looping background music with fades |
//! | [`count`] | Narrated count sequence |
//! | [`narrator`] | Playback façade |
#![deny(unused_crate_dependencies)]

pub mod audio_thread;
pub mod clips;
pub mod config;
pub mod count;
pub mod device;
pub mod error;
pub mod keys;
pub mod music;
pub mod narrator;
pub mod playback;
pub mod speech;
pub mod tones;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export key types for convenience
pub use audio_thread::RodioDevice;
pub use clips::{ClipCache, ClipSource, DirClipSource, HttpClipSource};
pub use config::{AudioConfig, ClipConfig, CountConfig, MusicConfig, SpeechConfig};
pub use count::{CountOutcome, CountSequence};
pub use device::{AudioDevice, Bus, ClipBuffer, SharedDevice, SilentDevice, Tone, Waveform};
pub use error::AudioError;
pub use keys::ClipKey;
pub use music::BackgroundMusic;
pub use narrator::{Narrator, NumberStyle, Playback, Prosody, clip_source_for};
pub use speech::{
    EspeakSynthesizer, NoSpeech, SpeechOutcome, SpeechQueue, SpeechSynthesizer, SpeechTicket,
    SystemVoice, Utterance, VoiceRule, VoiceSelector,
};
pub use tones::ToneSynth;
