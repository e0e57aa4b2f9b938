//! The audio device port and the value types that flow through it.
//!
//! The engine never talks to a sound card directly. Every component holds a
//! [`SharedDevice`] created once per session and schedules work against the
//! device's own clock, in seconds, so notes can be layered at absolute
//! timestamps without drift:
//!
//! | Implementor | Where used |
//! |---|---|
//! | [`RodioDevice`](crate::audio_thread::RodioDevice) | Desktop / CLI, rodio output on a dedicated thread |
//! | [`SilentDevice`] | Headless sessions, every operation is a no-op |

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::error::AudioError;

/// Shared handle to the session's audio device.
pub type SharedDevice = Arc<dyn AudioDevice>;

/// Abstraction over the sound output.
///
/// All methods take `&self`; implementations use interior mutability or a
/// command channel so the device can be shared behind an `Arc`.
pub trait AudioDevice: Send + Sync {
    /// Seconds elapsed on the device clock. Monotonic.
    fn current_time(&self) -> f64;

    /// Wake the output if the platform suspended it.
    fn resume(&self) {}

    /// `true` when nothing this device is asked to do will be audible.
    ///
    /// Components use this to skip work (network fetches, scheduling loops)
    /// that only makes sense with real output.
    fn is_silent(&self) -> bool {
        false
    }

    /// Schedule an enveloped oscillator note, optionally routed through a
    /// gain bus. `tone.start` is absolute device time.
    fn schedule_tone(&self, tone: Tone, bus: Option<&Bus>);

    /// Start playing a decoded clip immediately.
    fn play_clip(&self, clip: &ClipBuffer, volume: f32) -> Result<(), AudioError>;

    /// Decode an encoded clip payload (MP3/WAV) into a playable buffer.
    fn decode(&self, bytes: &[u8]) -> Result<ClipBuffer, AudioError>;
}

// ── Tones ──────────────────────────────────────────────────────────

/// Oscillator shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Waveform {
    Sine,
    Triangle,
}

impl Waveform {
    /// Sample the waveform at `phase` in cycles (`0.0..1.0`).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn sample(self, phase: f64) -> f32 {
        let phase = phase.fract();
        match self {
            Self::Sine => (phase * std::f64::consts::TAU).sin() as f32,
            Self::Triangle => (1.0 - 4.0 * (phase - 0.5).abs()) as f32,
        }
    }
}

/// One enveloped oscillator note.
///
/// The gain ramps linearly from 0 to `peak` over `attack` seconds (so the
/// note never clicks in), then decays exponentially to
/// [`Tone::SILENCE_FLOOR`] at `decay` seconds. The oscillator stops at
/// `stop` seconds. All three offsets are relative to `start`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency: f32,
    pub waveform: Waveform,
    pub start: f64,
    pub peak: f32,
    pub attack: f64,
    pub decay: f64,
    pub stop: f64,
}

impl Tone {
    /// Level the exponential decay ends on.
    pub const SILENCE_FLOOR: f32 = 0.0001;

    /// A short sound-effect note: 20 ms attack, decay over `duration`,
    /// stop 10 ms later.
    #[must_use]
    pub const fn effect(frequency: f32, start: f64, duration: f64, peak: f32, waveform: Waveform) -> Self {
        Self {
            frequency,
            waveform,
            start,
            peak,
            attack: 0.02,
            decay: duration,
            stop: duration + 0.01,
        }
    }

    /// The same note moved forward by `offset` seconds.
    #[must_use]
    pub fn shifted(mut self, offset: f64) -> Self {
        self.start += offset;
        self
    }

    /// Absolute device time at which the oscillator stops.
    #[must_use]
    pub fn end_time(&self) -> f64 {
        self.start + self.stop
    }

    /// Envelope gain `elapsed` seconds after `start`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn gain_at(&self, elapsed: f64) -> f32 {
        if elapsed < 0.0 || elapsed >= self.stop {
            return 0.0;
        }
        if elapsed < self.attack {
            return self.peak * (elapsed / self.attack) as f32;
        }
        if elapsed < self.decay && self.decay > self.attack {
            let progress = (elapsed - self.attack) / (self.decay - self.attack);
            let ratio = f64::from(Self::SILENCE_FLOOR / self.peak.max(Self::SILENCE_FLOOR));
            return self.peak * ratio.powf(progress) as f32;
        }
        Self::SILENCE_FLOOR.min(self.peak)
    }
}

// ── Gain automation ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum GainEvent {
    Set { time: f64, value: f32 },
    LinearRamp { end_time: f64, value: f32 },
}

impl GainEvent {
    const fn time(&self) -> f64 {
        match self {
            Self::Set { time, .. } => *time,
            Self::LinearRamp { end_time, .. } => *end_time,
        }
    }
}

/// A gain value with a timeline of automation events.
///
/// A linear ramp starts from the value and time of the previous event, the
/// same way audio graph parameters behave in browsers.
#[derive(Debug, Clone, PartialEq)]
pub struct GainParam {
    initial: f32,
    events: Vec<GainEvent>,
}

impl GainParam {
    #[must_use]
    pub const fn new(initial: f32) -> Self {
        Self {
            initial,
            events: Vec::new(),
        }
    }

    /// Jump to `value` at `time`.
    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.events.push(GainEvent::Set { time, value });
    }

    /// Ramp linearly from the previous event to `value` at `end_time`.
    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, end_time: f64) {
        self.events.push(GainEvent::LinearRamp { end_time, value });
    }

    /// Drop every event after `now`, pin the current value at `now`, then
    /// ramp to `value` over `duration` seconds.
    ///
    /// This never jumps: whatever the gain was doing at `now` is where the
    /// new ramp begins.
    pub fn ramp_from(&mut self, now: f64, value: f32, duration: f64) {
        let current = self.value_at(now);
        self.events.clear();
        self.initial = current;
        self.set_value_at_time(current, now);
        self.linear_ramp_to_value_at_time(value, now + duration.max(0.0));
    }

    /// Evaluate the parameter at device time `t`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn value_at(&self, t: f64) -> f32 {
        let mut value = self.initial;
        let mut from_time = 0.0_f64;
        for event in &self.events {
            match *event {
                GainEvent::Set { time, value: v } => {
                    if t < time {
                        return value;
                    }
                    value = v;
                    from_time = time;
                }
                GainEvent::LinearRamp { end_time, value: v } => {
                    if t < end_time {
                        if t <= from_time || end_time <= from_time {
                            return value;
                        }
                        let progress = (t - from_time) / (end_time - from_time);
                        return (f64::from(value) + f64::from(v - value) * progress) as f32;
                    }
                    value = v;
                    from_time = end_time;
                }
            }
        }
        value
    }

    /// Time of the last scheduled event, if any.
    #[must_use]
    pub fn last_event_time(&self) -> Option<f64> {
        self.events.last().map(GainEvent::time)
    }
}

static NEXT_BUS_ID: AtomicU64 = AtomicU64::new(1);

/// A gain stage that notes can be routed through.
///
/// Cloning shares the underlying parameter: every note scheduled on a bus
/// follows its automation, including fades scheduled after the note.
#[derive(Debug, Clone)]
pub struct Bus {
    id: u64,
    gain: Arc<Mutex<GainParam>>,
}

impl Bus {
    /// Create a bus with the given initial gain.
    #[must_use]
    pub fn new(initial: f32) -> Self {
        Self {
            id: NEXT_BUS_ID.fetch_add(1, Ordering::Relaxed),
            gain: Arc::new(Mutex::new(GainParam::new(initial))),
        }
    }

    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Gain of the bus at device time `t`.
    #[must_use]
    pub fn gain_at(&self, t: f64) -> f32 {
        self.with_gain(|gain| gain.value_at(t))
    }

    pub fn set_value_at_time(&self, value: f32, time: f64) {
        self.with_gain(|gain| gain.set_value_at_time(value, time));
    }

    pub fn linear_ramp_to_value_at_time(&self, value: f32, end_time: f64) {
        self.with_gain(|gain| gain.linear_ramp_to_value_at_time(value, end_time));
    }

    /// See [`GainParam::ramp_from`].
    pub fn ramp_from(&self, now: f64, value: f32, duration: f64) {
        self.with_gain(|gain| gain.ramp_from(now, value, duration));
    }

    fn with_gain<R>(&self, f: impl FnOnce(&mut GainParam) -> R) -> R {
        let mut gain = self.gain.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut gain)
    }
}

// ── Clips ──────────────────────────────────────────────────────────

/// A decoded, playable clip. Cheap to clone.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipBuffer {
    samples: Arc<[f32]>,
    channels: u16,
    sample_rate: u32,
}

impl ClipBuffer {
    /// Wrap interleaved PCM samples.
    #[must_use]
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            channels: channels.max(1),
            sample_rate: sample_rate.max(1),
        }
    }

    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[must_use]
    pub const fn channels(&self) -> u16 {
        self.channels
    }

    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Playback length.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration(&self) -> Duration {
        let frames = self.samples.len() / usize::from(self.channels);
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate))
    }
}

// ── Silent device ──────────────────────────────────────────────────

/// Device for sessions without sound output.
///
/// The clock still advances (on the tokio clock, so paused-time tests see
/// it move) but nothing is scheduled, played or decoded.
#[derive(Debug)]
pub struct SilentDevice {
    epoch: tokio::time::Instant,
}

impl SilentDevice {
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: tokio::time::Instant::now(),
        }
    }

    /// Convenience constructor returning a [`SharedDevice`].
    #[must_use]
    pub fn shared() -> SharedDevice {
        Arc::new(Self::new())
    }
}

impl Default for SilentDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioDevice for SilentDevice {
    fn current_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn is_silent(&self) -> bool {
        true
    }

    fn schedule_tone(&self, _tone: Tone, _bus: Option<&Bus>) {}

    fn play_clip(&self, _clip: &ClipBuffer, _volume: f32) -> Result<(), AudioError> {
        Ok(())
    }

    fn decode(&self, _bytes: &[u8]) -> Result<ClipBuffer, AudioError> {
        Err(AudioError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn linear_ramp_interpolates_from_previous_event() {
        let mut gain = GainParam::new(1.0);
        gain.set_value_at_time(0.0, 1.0);
        gain.linear_ramp_to_value_at_time(0.8, 3.0);

        assert!(close(gain.value_at(0.5), 1.0));
        assert!(close(gain.value_at(1.0), 0.0));
        assert!(close(gain.value_at(2.0), 0.4));
        assert!(close(gain.value_at(10.0), 0.8));
    }

    #[test]
    fn ramp_from_starts_at_current_value() {
        let mut gain = GainParam::new(0.0);
        gain.set_value_at_time(0.0, 0.0);
        gain.linear_ramp_to_value_at_time(1.0, 2.0);

        // Halfway through the fade-in, ramp down to silence over one second.
        gain.ramp_from(1.0, 0.0, 1.0);
        assert!(close(gain.value_at(1.0), 0.5));
        assert!(close(gain.value_at(1.5), 0.25));
        assert!(close(gain.value_at(2.5), 0.0));
        assert_eq!(gain.last_event_time(), Some(2.0));
    }

    #[test]
    fn tone_envelope_attacks_then_decays() {
        let tone = Tone::effect(440.0, 0.0, 0.2, 0.1, Waveform::Sine);

        assert!(close(tone.gain_at(-0.1), 0.0));
        assert!(close(tone.gain_at(0.01), 0.05));
        assert!(close(tone.gain_at(0.02), 0.1));
        assert!(tone.gain_at(0.1) < 0.1);
        assert!(tone.gain_at(0.15) < tone.gain_at(0.1));
        assert!(close(tone.gain_at(0.205), Tone::SILENCE_FLOOR));
        assert!(close(tone.gain_at(0.3), 0.0));
        assert!((tone.end_time() - 0.21).abs() < 1e-9);
    }

    #[test]
    fn waveforms_stay_in_range() {
        for i in 0..100 {
            let phase = f64::from(i) / 100.0;
            for wave in [Waveform::Sine, Waveform::Triangle] {
                let s = wave.sample(phase);
                assert!((-1.0..=1.0).contains(&s));
            }
        }
        assert!(close(Waveform::Triangle.sample(0.5), 1.0));
    }

    #[test]
    fn clip_duration_accounts_for_channels() {
        let clip = ClipBuffer::new(vec![0.0; 48_000], 2, 24_000);
        assert_eq!(clip.duration(), Duration::from_secs(1));
    }

    #[test]
    fn buses_share_automation_between_clones() {
        let bus = Bus::new(0.0);
        let clone = bus.clone();
        bus.set_value_at_time(0.5, 0.0);
        assert!(close(clone.gain_at(1.0), 0.5));
        assert_eq!(bus.id(), clone.id());
        assert_ne!(bus.id(), Bus::new(0.0).id());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_device_clock_follows_tokio_time() {
        let device = SilentDevice::new();
        tokio::time::advance(Duration::from_millis(1500)).await;
        assert!((device.current_time() - 1.5).abs() < 1e-6);
        assert!(device.is_silent());
        assert!(device.decode(b"anything").is_err());
    }
}
