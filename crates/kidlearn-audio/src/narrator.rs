//! Playback façade for the games.
//!
//! [`Narrator`] owns the session device and every audio component. Each
//! `play_*` call tries the pre-rendered clip first and falls back to speech
//! synthesis with prosody tuned for young listeners. Expected failures
//! (missing clip, no voices, silent device) never surface as errors; they
//! degrade to speech or to silence and are logged.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

use crate::audio_thread::RodioDevice;
use crate::clips::{ClipCache, ClipSource, DirClipSource, HttpClipSource};
use crate::config::AudioConfig;
use crate::count::CountSequence;
use crate::device::SharedDevice;
use crate::error::AudioError;
use crate::keys::{self, ClipKey};
use crate::music::BackgroundMusic;
use crate::speech::{
    EspeakSynthesizer, SpeechOutcome, SpeechQueue, SpeechSynthesizer, Utterance,
};
use crate::tones::ToneSynth;

/// Speaking rate and pitch for a fallback utterance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prosody {
    pub rate: f32,
    pub pitch: f32,
}

impl Prosody {
    pub const LETTER: Self = Self::new(0.70, 1.2);
    pub const WORD: Self = Self::new(0.76, 1.1);
    pub const DE_WORD: Self = Self::new(0.80, 1.1);
    pub const NUMBER: Self = Self::new(0.76, 1.1);
    pub const COUNT: Self = Self::new(0.72, 1.2);
    pub const PHRASE: Self = Self::new(0.84, 1.12);
    pub const FEEDBACK: Self = Self::new(0.88, 1.15);
    pub const TRY_AGAIN: Self = Self::new(0.82, 1.1);

    #[must_use]
    pub const fn new(rate: f32, pitch: f32) -> Self {
        Self { rate, pitch }
    }
}

impl Default for Prosody {
    fn default() -> Self {
        Self::PHRASE
    }
}

/// How a number is voiced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberStyle {
    /// The number name, `num-<n>` ("tres").
    Labeled,
    /// The short numeral used while counting, `count-<n>`.
    Bare,
}

/// What a `play_*` call ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    /// A pre-rendered clip started.
    Clip { duration: Duration },
    /// The text went through the speech queue.
    Speech(SpeechOutcome),
}

impl Playback {
    #[must_use]
    pub const fn is_clip(&self) -> bool {
        matches!(self, Self::Clip { .. })
    }
}

/// How a fallback utterance joins the speech queue.
#[derive(Clone, Copy)]
enum Delivery<'a> {
    /// Behind whatever is queued.
    Enqueue,
    /// Replacing everything queued.
    Interrupt,
    /// Behind whatever is queued, dropped once the token fires.
    Cancellable(&'a CancellationToken),
}

const LETTER_WORD_GAP: Duration = Duration::from_millis(80);
const FEEDBACK_GAP: Duration = Duration::from_millis(200);
const CELEBRATION_GAP: Duration = Duration::from_millis(380);

/// The session's audio engine.
pub struct Narrator {
    device: SharedDevice,
    tones: ToneSynth,
    clips: Arc<ClipCache>,
    speech: SpeechQueue,
    music: BackgroundMusic,
    config: AudioConfig,
    rng: Mutex<StdRng>,
}

impl Narrator {
    /// Assemble a narrator from its ports. Must be called inside a tokio
    /// runtime; the speech worker is spawned here.
    #[must_use]
    pub fn new(
        device: SharedDevice,
        clip_source: Arc<dyn ClipSource>,
        synth: Arc<dyn SpeechSynthesizer>,
        config: AudioConfig,
    ) -> Arc<Self> {
        let clips = Arc::new(ClipCache::new(
            clip_source,
            Arc::clone(&device),
            config.clips.clone(),
        ));
        let speech = SpeechQueue::new(synth, config.speech.clone());
        let music = BackgroundMusic::new(Arc::clone(&device), config.music.clone());

        tracing::info!(
            clips = %config.clips.location,
            lang = %config.speech.lang,
            silent = device.is_silent(),
            "Narrator ready"
        );

        Arc::new(Self {
            tones: ToneSynth::new(Arc::clone(&device)),
            device,
            clips,
            speech,
            music,
            config,
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    /// Open the default sound output and the platform synthesizer.
    ///
    /// Fails fast if no output device can be opened; callers that want to
    /// keep going without sound can build a narrator over a
    /// [`SilentDevice`](crate::device::SilentDevice) with [`Narrator::new`].
    pub fn open(config: AudioConfig) -> Result<Arc<Self>, AudioError> {
        config.validate()?;
        let device: SharedDevice = Arc::new(RodioDevice::open()?);
        let source = clip_source_for(&config.clips.location);
        let synth = EspeakSynthesizer::spawn(config.speech.program.clone());
        Ok(Self::new(device, source, synth, config))
    }

    /// Wake the output device.
    pub fn init(&self) {
        self.device.resume();
    }

    // ── Prompts ────────────────────────────────────────────────────

    /// `letter-<L>`, or the Spanish letter name.
    pub async fn play_letter(&self, letter: &str) -> Playback {
        self.play_or_say(
            &ClipKey::letter(letter),
            &keys::letter_name(letter),
            Prosody::LETTER,
            Delivery::Enqueue,
        )
        .await
    }

    /// `word-<W>`, or the lowercase word.
    pub async fn play_word(&self, word: &str) -> Playback {
        self.play_or_say(
            &ClipKey::word(word),
            &word.to_lowercase(),
            Prosody::WORD,
            Delivery::Enqueue,
        )
        .await
    }

    /// The letter, a short gap after it ends, then "de <word>".
    pub async fn play_letter_word(&self, letter: &str, word: &str) -> Playback {
        let gap = match self.play_letter(letter).await {
            Playback::Clip { duration } => duration + LETTER_WORD_GAP,
            Playback::Speech(_) => LETTER_WORD_GAP,
        };
        tokio::time::sleep(gap).await;
        self.play_or_say(
            &ClipKey::de_word(word),
            &format!("de {}", word.to_lowercase()),
            Prosody::DE_WORD,
            Delivery::Enqueue,
        )
        .await
    }

    pub async fn play_number(&self, n: u32, style: NumberStyle) -> Playback {
        self.say_number(n, style, Delivery::Enqueue).await
    }

    /// [`play_number`](Self::play_number) whose fallback speech is dropped
    /// once `cancel` fires, without touching the rest of the queue.
    pub async fn play_number_cancellable(
        &self,
        n: u32,
        style: NumberStyle,
        cancel: &CancellationToken,
    ) -> Playback {
        self.say_number(n, style, Delivery::Cancellable(cancel)).await
    }

    async fn say_number(&self, n: u32, style: NumberStyle, delivery: Delivery<'_>) -> Playback {
        match style {
            NumberStyle::Labeled => {
                self.play_or_say(
                    &ClipKey::number(n),
                    &keys::number_label(n),
                    Prosody::NUMBER,
                    delivery,
                )
                .await
            }
            NumberStyle::Bare => {
                self.play_or_say(&ClipKey::count(n), &n.to_string(), Prosody::COUNT, delivery)
                    .await
            }
        }
    }

    /// Any phrase clip with a spoken fallback.
    pub async fn play_phrase(&self, key: &ClipKey, fallback: &str, prosody: Prosody) -> Playback {
        self.play_or_say(key, fallback, prosody, Delivery::Enqueue)
            .await
    }

    // ── Feedback ───────────────────────────────────────────────────
    //
    // Feedback cuts off whatever is queued: a stale prompt must never be
    // spoken over the reaction to the child's answer.

    /// Sparkle tone, then a random praise phrase.
    pub async fn play_correct(&self) -> Playback {
        self.tones.sparkle();
        tokio::time::sleep(FEEDBACK_GAP).await;

        let (n, text) = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            let n = rng.gen_range(1..=ClipKey::CELEBRATION_COUNT);
            let text = keys::CORRECT_TEXTS[rng.gen_range(0..keys::CORRECT_TEXTS.len())];
            (n, text)
        };
        self.play_or_say(
            &ClipKey::celebrate(n),
            text,
            Prosody::FEEDBACK,
            Delivery::Interrupt,
        )
        .await
    }

    /// Wrong tone, then "try again".
    pub async fn play_try_again(&self) -> Playback {
        self.tones.wrong();
        tokio::time::sleep(FEEDBACK_GAP).await;
        self.play_or_say(
            &ClipKey::phrase(ClipKey::TRY_AGAIN),
            keys::TRY_AGAIN_TEXT,
            Prosody::TRY_AGAIN,
            Delivery::Interrupt,
        )
        .await
    }

    /// Fanfare, then a random celebration phrase.
    pub async fn play_celebration_voice(&self) -> Playback {
        self.tones.celebration();
        tokio::time::sleep(CELEBRATION_GAP).await;

        let n = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(1..=ClipKey::CELEBRATION_COUNT);
        self.play_or_say(
            &ClipKey::celebrate(n),
            keys::CELEBRATIONS[n - 1],
            Prosody::FEEDBACK,
            Delivery::Interrupt,
        )
        .await
    }

    // ── Counting ───────────────────────────────────────────────────

    /// Count from 1 to `up_to` out loud. See [`CountSequence`].
    pub fn start_count_sequence<S, D>(
        self: &Arc<Self>,
        up_to: u32,
        on_step: S,
        on_done: D,
    ) -> CountSequence
    where
        S: FnMut(u32) + Send + 'static,
        D: FnOnce() + Send + 'static,
    {
        CountSequence::spawn(Arc::clone(self), up_to, on_step, on_done)
    }

    // ── Preloading ─────────────────────────────────────────────────

    pub fn preload(&self, keys: impl IntoIterator<Item = ClipKey>) {
        self.clips.preload(keys);
    }

    /// Preload the feedback and counting clips.
    pub fn preload_critical(&self) {
        self.clips.preload(keys::critical_keys());
    }

    // ── Accessors ──────────────────────────────────────────────────

    #[must_use]
    pub const fn tones(&self) -> &ToneSynth {
        &self.tones
    }

    #[must_use]
    pub const fn music(&self) -> &BackgroundMusic {
        &self.music
    }

    #[must_use]
    pub const fn speech(&self) -> &SpeechQueue {
        &self.speech
    }

    #[must_use]
    pub fn clips(&self) -> &ClipCache {
        &self.clips
    }

    #[must_use]
    pub fn device(&self) -> &SharedDevice {
        &self.device
    }

    #[must_use]
    pub const fn config(&self) -> &AudioConfig {
        &self.config
    }

    async fn play_or_say(
        &self,
        key: &ClipKey,
        text: &str,
        prosody: Prosody,
        delivery: Delivery<'_>,
    ) -> Playback {
        if let Some(duration) = self.clips.start(key, self.config.clips.volume).await {
            return Playback::Clip { duration };
        }

        let utterance = Utterance::new(text, prosody.rate, prosody.pitch, &self.config.speech.lang);
        let ticket = match delivery {
            Delivery::Enqueue => self.speech.enqueue(utterance),
            Delivery::Interrupt => self.speech.interrupt(utterance),
            Delivery::Cancellable(cancel) => self.speech.enqueue_cancellable(utterance, cancel),
        };
        Playback::Speech(ticket.await)
    }
}

/// Clip source for a configured location: an `http(s)://` base URL or a
/// local directory.
#[must_use]
pub fn clip_source_for(location: &str) -> Arc<dyn ClipSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Arc::new(HttpClipSource::new(location))
    } else {
        Arc::new(DirClipSource::new(location))
    }
}
