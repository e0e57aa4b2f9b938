//! Recording doubles for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, watch};

use crate::device::{AudioDevice, Bus, ClipBuffer, Tone};
use crate::error::AudioError;
use crate::speech::{SpeechSynthesizer, SystemVoice, Utterance};

/// Device that records everything it is asked to do.
///
/// The clock follows tokio time. `decode` fails for the payload `corrupt`
/// and otherwise yields one mono sample per byte at 1 kHz, so a payload of
/// N bytes plays for N milliseconds.
pub(crate) struct RecordingDevice {
    epoch: tokio::time::Instant,
    tones: Mutex<Vec<(Tone, Option<u64>)>>,
    clips: Mutex<Vec<(Duration, f32)>>,
    decodes: AtomicUsize,
}

impl RecordingDevice {
    pub(crate) fn new() -> Self {
        Self {
            epoch: tokio::time::Instant::now(),
            tones: Mutex::new(Vec::new()),
            clips: Mutex::new(Vec::new()),
            decodes: AtomicUsize::new(0),
        }
    }

    pub(crate) fn tones(&self) -> Vec<Tone> {
        self.tones.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    pub(crate) fn bus_tones(&self, bus: &Bus) -> Vec<Tone> {
        self.tones
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, id)| *id == Some(bus.id()))
            .map(|(t, _)| *t)
            .collect()
    }

    pub(crate) fn clips_played(&self) -> Vec<(Duration, f32)> {
        self.clips.lock().unwrap().clone()
    }

    pub(crate) fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }
}

impl AudioDevice for RecordingDevice {
    fn current_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn schedule_tone(&self, tone: Tone, bus: Option<&Bus>) {
        self.tones.lock().unwrap().push((tone, bus.map(Bus::id)));
    }

    fn play_clip(&self, clip: &ClipBuffer, volume: f32) -> Result<(), AudioError> {
        self.clips.lock().unwrap().push((clip.duration(), volume));
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> Result<ClipBuffer, AudioError> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        if bytes == b"corrupt" {
            return Err(AudioError::DecodeError("corrupt payload".into()));
        }
        Ok(ClipBuffer::new(vec![0.0; bytes.len()], 1, 1_000))
    }
}

/// What the scripted synthesizer observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SpeechEvent {
    Started { text: String, voice: Option<String> },
    Finished(String),
}

/// Synthesizer whose behaviour is set up per test.
pub(crate) struct ScriptedSynthesizer {
    available: bool,
    voices: Mutex<Vec<SystemVoice>>,
    generation: watch::Sender<u64>,
    speak_for: Duration,
    fail_on: Option<String>,
    hang_on: Option<String>,
    events: Mutex<Vec<SpeechEvent>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    cancels: AtomicUsize,
    cancel: Notify,
}

impl ScriptedSynthesizer {
    pub(crate) fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            available: true,
            voices: Mutex::new(Vec::new()),
            generation,
            speak_for: Duration::from_millis(300),
            fail_on: None,
            hang_on: None,
            events: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
            cancel: Notify::new(),
        }
    }

    pub(crate) fn with_voices(self, voices: Vec<SystemVoice>) -> Self {
        self.set_voices(voices);
        self
    }

    pub(crate) fn speaking_for(mut self, duration: Duration) -> Self {
        self.speak_for = duration;
        self
    }

    pub(crate) fn failing_on(mut self, text: &str) -> Self {
        self.fail_on = Some(text.to_string());
        self
    }

    pub(crate) fn hanging_on(mut self, text: &str) -> Self {
        self.hang_on = Some(text.to_string());
        self
    }

    pub(crate) fn set_voices(&self, voices: Vec<SystemVoice>) {
        *self.voices.lock().unwrap() = voices;
        self.generation.send_modify(|g| *g += 1);
    }

    pub(crate) fn events(&self) -> Vec<SpeechEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn spoken(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SpeechEvent::Started { text, .. } => Some(text),
                SpeechEvent::Finished(_) => None,
            })
            .collect()
    }

    pub(crate) fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub(crate) fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter even when the queue drops the future.
struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub(crate) fn voice(name: &str, lang: &str) -> SystemVoice {
    SystemVoice {
        id: name.to_lowercase(),
        name: name.to_string(),
        lang: lang.to_string(),
    }
}

#[async_trait]
impl SpeechSynthesizer for ScriptedSynthesizer {
    fn is_available(&self) -> bool {
        self.available
    }

    fn voices(&self) -> Vec<SystemVoice> {
        self.voices.lock().unwrap().clone()
    }

    fn subscribe_voices(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    async fn speak(
        &self,
        utterance: &Utterance,
        voice: Option<&SystemVoice>,
    ) -> Result<(), AudioError> {
        self.events.lock().unwrap().push(SpeechEvent::Started {
            text: utterance.text.clone(),
            voice: voice.map(|v| v.name.clone()),
        });
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        let _active = ActiveGuard(&self.active);

        let result = if self.fail_on.as_deref() == Some(utterance.text.as_str()) {
            Err(AudioError::SynthesisError("scripted failure".into()))
        } else {
            let hang = self.hang_on.as_deref() == Some(utterance.text.as_str());
            tokio::select! {
                () = self.cancel.notified() => Err(AudioError::Cancelled),
                () = async {
                    if hang {
                        std::future::pending::<()>().await;
                    }
                    tokio::time::sleep(self.speak_for).await;
                } => Ok(()),
            }
        };

        self.events
            .lock()
            .unwrap()
            .push(SpeechEvent::Finished(utterance.text.clone()));
        result
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        self.cancel.notify_waiters();
    }
}
