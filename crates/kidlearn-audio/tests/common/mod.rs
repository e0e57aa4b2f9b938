//! Shared doubles for the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use kidlearn_audio::{
    AudioConfig, AudioDevice, AudioError, Bus, ClipBuffer, ClipKey, ClipSource, Narrator,
    SpeechSynthesizer, SystemVoice, Tone, Utterance,
};
use tokio::sync::{Notify, watch};

// ── Device ─────────────────────────────────────────────────────────

/// Records tones and clips; one mono sample per payload byte at 1 kHz.
pub struct RecordingDevice {
    epoch: tokio::time::Instant,
    tones: Mutex<Vec<Tone>>,
    clips: Mutex<Vec<Duration>>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self {
            epoch: tokio::time::Instant::now(),
            tones: Mutex::new(Vec::new()),
            clips: Mutex::new(Vec::new()),
        }
    }

    pub fn tones(&self) -> Vec<Tone> {
        self.tones.lock().unwrap().clone()
    }

    pub fn clips(&self) -> Vec<Duration> {
        self.clips.lock().unwrap().clone()
    }
}

impl AudioDevice for RecordingDevice {
    fn current_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn schedule_tone(&self, tone: Tone, _bus: Option<&Bus>) {
        self.tones.lock().unwrap().push(tone);
    }

    fn play_clip(&self, clip: &ClipBuffer, _volume: f32) -> Result<(), AudioError> {
        self.clips.lock().unwrap().push(clip.duration());
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> Result<ClipBuffer, AudioError> {
        Ok(ClipBuffer::new(vec![0.0; bytes.len()], 1, 1_000))
    }
}

// ── Clip source ────────────────────────────────────────────────────

/// In-memory clip store. Each clip is `millis` bytes long.
#[derive(Default)]
pub struct MemoryClips {
    clips: HashMap<String, usize>,
    fetches: AtomicUsize,
}

impl MemoryClips {
    pub fn with(mut self, key: &ClipKey, millis: usize) -> Self {
        self.clips.insert(key.to_string(), millis);
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClipSource for MemoryClips {
    async fn fetch(&self, key: &ClipKey) -> Result<Option<Bytes>, AudioError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .clips
            .get(key.as_str())
            .map(|&millis| Bytes::from(vec![0u8; millis])))
    }
}

// ── Synthesizer ────────────────────────────────────────────────────

/// Synthesizer with one Spanish voice that takes `per_utterance` per line.
pub struct FakeSpeech {
    per_utterance: Duration,
    generation: watch::Sender<u64>,
    spoken: Mutex<Vec<(String, f32, f32)>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    cancel: Notify,
}

impl FakeSpeech {
    pub fn new(per_utterance: Duration) -> Self {
        let (generation, _) = watch::channel(1);
        Self {
            per_utterance,
            generation,
            spoken: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            cancel: Notify::new(),
        }
    }

    /// Texts in the order they started.
    pub fn texts(&self) -> Vec<String> {
        self.spoken.lock().unwrap().iter().map(|(t, _, _)| t.clone()).collect()
    }

    /// (text, rate, pitch) in the order they started.
    pub fn utterances(&self) -> Vec<(String, f32, f32)> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

struct Active<'a>(&'a AtomicUsize);

impl Drop for Active<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    fn is_available(&self) -> bool {
        true
    }

    fn voices(&self) -> Vec<SystemVoice> {
        vec![SystemVoice {
            id: "es-419".into(),
            name: "Paulina".into(),
            lang: "es-MX".into(),
        }]
    }

    fn subscribe_voices(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    async fn speak(
        &self,
        utterance: &Utterance,
        _voice: Option<&SystemVoice>,
    ) -> Result<(), AudioError> {
        self.spoken.lock().unwrap().push((
            utterance.text.clone(),
            utterance.rate,
            utterance.pitch,
        ));
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        let _active = Active(&self.active);

        tokio::select! {
            () = self.cancel.notified() => Err(AudioError::Cancelled),
            () = tokio::time::sleep(self.per_utterance) => Ok(()),
        }
    }

    fn cancel(&self) {
        self.cancel.notify_waiters();
    }
}

// ── Harness ────────────────────────────────────────────────────────

pub struct Harness {
    pub narrator: Arc<Narrator>,
    pub device: Arc<RecordingDevice>,
    pub clips: Arc<MemoryClips>,
    pub speech: Arc<FakeSpeech>,
}

pub fn harness(clips: MemoryClips) -> Harness {
    let device = Arc::new(RecordingDevice::new());
    let clips = Arc::new(clips);
    let speech = Arc::new(FakeSpeech::new(Duration::from_millis(400)));
    let narrator = Narrator::new(
        device.clone(),
        clips.clone(),
        speech.clone(),
        AudioConfig::default(),
    );
    Harness {
        narrator,
        device,
        clips,
        speech,
    }
}
