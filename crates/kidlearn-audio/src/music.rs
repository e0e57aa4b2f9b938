//! Background music scheduler.
//!
//! The tune is a fixed 32-note melody scheduled one pass at a time on a
//! dedicated gain [`Bus`]. A spawned task re-arms shortly before each pass
//! ends and schedules the next one back to back, so the music loops without
//! gaps. Fades are automation on the bus, never per-note changes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::MusicConfig;
use crate::device::{Bus, SharedDevice, Tone, Waveform};

/// The melody: (frequency Hz, duration s).
pub const MELODY: [(f32, f64); 32] = [
    (523.0, 0.55),
    (392.0, 0.35),
    (440.0, 0.35),
    (523.0, 0.45),
    (659.0, 0.35),
    (523.0, 0.35),
    (392.0, 0.55),
    (330.0, 0.35),
    (294.0, 0.35),
    (261.0, 0.65),
    (294.0, 0.40),
    (330.0, 0.35),
    (392.0, 0.50),
    (440.0, 0.35),
    (523.0, 0.45),
    (659.0, 0.35),
    (587.0, 0.35),
    (523.0, 0.75),
    (440.0, 0.40),
    (523.0, 0.35),
    (659.0, 0.50),
    (523.0, 0.35),
    (440.0, 0.40),
    (392.0, 0.35),
    (330.0, 0.35),
    (294.0, 0.65),
    (523.0, 0.45),
    (440.0, 0.35),
    (392.0, 0.45),
    (330.0, 0.35),
    (294.0, 0.40),
    (261.0, 0.90),
];

const MELODY_PEAK: f32 = 0.065;
const BASS_PEAK: f32 = 0.032;

/// Total length of one pass in seconds.
/// `secs` as a duration; negative and non-finite values count as zero.
fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::ZERO)
}

fn probability(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}

#[must_use]
pub fn melody_duration() -> f64 {
    MELODY.iter().map(|(_, d)| d).sum()
}

/// Schedule one pass of the melody on `bus` starting at `t0`. Each note gets
/// a soft bass undertone an octave down with probability `bass_probability`.
/// Returns the length of the pass.
pub fn schedule_pass(
    device: &SharedDevice,
    bus: &Bus,
    t0: f64,
    rng: &mut impl Rng,
    bass_probability: f64,
) -> f64 {
    let mut t = t0;
    for &(frequency, duration) in &MELODY {
        device.schedule_tone(
            Tone {
                frequency,
                waveform: Waveform::Sine,
                start: t,
                peak: MELODY_PEAK,
                attack: 0.03,
                decay: duration * 0.85,
                stop: duration,
            },
            Some(bus),
        );

        if rng.gen_bool(probability(bass_probability)) {
            device.schedule_tone(
                Tone {
                    frequency: frequency / 2.0,
                    waveform: Waveform::Triangle,
                    start: t,
                    peak: BASS_PEAK,
                    attack: 0.05,
                    decay: duration * 0.7,
                    stop: duration,
                },
                Some(bus),
            );
        }
        t += duration;
    }
    t - t0
}

struct MusicSession {
    bus: Bus,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Looping background music.
pub struct BackgroundMusic {
    device: SharedDevice,
    config: MusicConfig,
    session: Mutex<Option<MusicSession>>,
    passes: Arc<AtomicUsize>,
    sessions: AtomicUsize,
}

impl BackgroundMusic {
    #[must_use]
    pub fn new(device: SharedDevice, config: MusicConfig) -> Self {
        Self {
            device,
            config,
            session: Mutex::new(None),
            passes: Arc::new(AtomicUsize::new(0)),
            sessions: AtomicUsize::new(0),
        }
    }

    /// Start the music. Returns `false` if it was already playing or the
    /// device is silent.
    pub fn start(&self) -> bool {
        if self.device.is_silent() {
            return false;
        }

        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if session.is_some() {
            return false;
        }

        let now = self.device.current_time();
        let bus = Bus::new(0.0);
        bus.set_value_at_time(0.0, now);
        bus.linear_ramp_to_value_at_time(self.config.target_gain, now + self.config.fade_in_secs);

        let mut rng = self
            .config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

        // The first pass goes out synchronously so music is audible even if
        // the runtime is busy.
        let mut next_start = now + self.config.lead_in_secs;
        next_start += schedule_pass(
            &self.device,
            &bus,
            next_start,
            &mut rng,
            self.config.bass_probability,
        );
        self.passes.fetch_add(1, Ordering::SeqCst);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(Self::run(
            Arc::clone(&self.device),
            bus.clone(),
            self.config.clone(),
            cancel.clone(),
            Arc::clone(&self.passes),
            rng,
            next_start,
        ));

        let started = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(session = started, bus = bus.id(), "Background music started");

        *session = Some(MusicSession { bus, cancel, task });
        true
    }

    /// Re-arm loop: sleep until just before the scheduled music runs out,
    /// then schedule the next pass.
    async fn run(
        device: SharedDevice,
        bus: Bus,
        config: MusicConfig,
        cancel: CancellationToken,
        passes: Arc<AtomicUsize>,
        mut rng: StdRng,
        mut next_start: f64,
    ) {
        let min_rearm = Duration::from_millis(config.min_rearm_ms);
        loop {
            let ahead = next_start - device.current_time() - config.look_ahead_secs;
            let wait = seconds(ahead).max(min_rearm);

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(wait) => {}
            }

            next_start += schedule_pass(&device, &bus, next_start, &mut rng, config.bass_probability);
            let total = passes.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::debug!(passes = total, next_start, "Scheduled music pass");
        }
        tracing::debug!(bus = bus.id(), "Music scheduler stopped");
    }

    /// Fade out and stop. A no-op when not playing.
    ///
    /// The re-arm timer is cancelled before this returns; notes already
    /// scheduled keep sounding under the fade. The bus is released once the
    /// fade has finished, and a new [`start`](Self::start) is allowed right
    /// away on a fresh bus.
    pub fn stop(&self) {
        let Some(session) = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };

        session.cancel.cancel();
        let now = self.device.current_time();
        session.bus.ramp_from(now, 0.0, self.config.fade_out_secs);
        tracing::info!(bus = session.bus.id(), "Background music stopping");

        let release = seconds(self.config.release_after_secs);
        let MusicSession { bus, task, .. } = session;
        tokio::spawn(async move {
            tokio::time::sleep(release).await;
            let _ = task.await;
            tracing::debug!(bus = bus.id(), "Music bus released");
        });
    }

    /// Ramp to `volume` (0.0 to 1.0) of the target gain.
    pub fn set_volume(&self, volume: f32) {
        let session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = session.as_ref() {
            let target = volume.clamp(0.0, 1.0) * self.config.target_gain;
            let now = self.device.current_time();
            session
                .bus
                .ramp_from(now, target, self.config.volume_ramp_secs);
            tracing::debug!(volume, target, "Music volume changed");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Melody passes scheduled since construction.
    #[must_use]
    pub fn passes_scheduled(&self) -> usize {
        self.passes.load(Ordering::SeqCst)
    }

    /// Successful [`start`](Self::start) calls since construction.
    #[must_use]
    pub fn sessions_started(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }
}

impl Drop for BackgroundMusic {
    fn drop(&mut self) {
        if let Some(session) = self
            .session
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            session.cancel.cancel();
        }
    }
}
