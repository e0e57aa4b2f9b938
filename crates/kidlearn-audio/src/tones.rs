//! Short synthesized sound effects.
//!
//! Each effect is a fixed plan of [`Tone`]s with offsets relative to the
//! moment it is triggered. [`ToneSynth`] shifts the whole plan by the device
//! clock once, so overlapping notes stay locked together.

use crate::device::{SharedDevice, Tone, Waveform};

/// Pentatonic ladder used by the count blip, C4 to A5.
pub const PENTATONIC: [f32; 10] = [
    261.0, 294.0, 330.0, 392.0, 440.0, 523.0, 587.0, 659.0, 784.0, 880.0,
];

const SPARKLE_PEAK: f32 = 0.13;
const CELEBRATION_RUN_PEAK: f32 = 0.14;
const CELEBRATION_CHORD_PEAK: f32 = 0.09;

/// Blip frequency for step `n` of a count. Step 0 is treated as step 1 and
/// everything past the tenth step stays on the top note.
#[must_use]
pub fn count_blip_frequency(n: u32) -> f32 {
    let index = usize::try_from(n.max(1) - 1).unwrap_or(usize::MAX);
    PENTATONIC[index.min(PENTATONIC.len() - 1)]
}

/// Rising four-note arpeggio for a correct answer.
#[must_use]
pub fn sparkle_plan() -> Vec<Tone> {
    [(523.0, 0.0, 0.22), (659.0, 0.10, 0.22), (784.0, 0.20, 0.22), (1047.0, 0.32, 0.38)]
        .into_iter()
        .map(|(f, t, d)| Tone::effect(f, t, d, SPARKLE_PEAK, Waveform::Sine))
        .collect()
}

/// Two descending triangle notes for a wrong answer.
#[must_use]
pub fn wrong_plan() -> Vec<Tone> {
    vec![
        Tone::effect(370.0, 0.0, 0.22, 0.11, Waveform::Triangle),
        Tone::effect(311.0, 0.21, 0.32, 0.09, Waveform::Triangle),
    ]
}

/// One count step: the ladder note plus a quiet octave overtone.
#[must_use]
pub fn count_blip_plan(n: u32) -> Vec<Tone> {
    let f = count_blip_frequency(n);
    vec![
        Tone::effect(f, 0.0, 0.18, 0.14, Waveform::Sine),
        Tone::effect(f * 2.0, 0.0, 0.09, 0.04, Waveform::Sine),
    ]
}

/// G-major run followed by a held chord.
#[must_use]
pub fn celebration_plan() -> Vec<Tone> {
    let run = [
        (392.0, 0.0),
        (440.0, 0.1),
        (494.0, 0.2),
        (523.0, 0.31),
        (587.0, 0.43),
        (659.0, 0.56),
        (698.0, 0.69),
        (784.0, 0.83),
    ]
    .into_iter()
    .map(|(f, t)| Tone::effect(f, t, 0.28, CELEBRATION_RUN_PEAK, Waveform::Sine));

    let chord = [784.0, 988.0, 1175.0]
        .into_iter()
        .map(|f| Tone::effect(f, 1.05, 0.65, CELEBRATION_CHORD_PEAK, Waveform::Sine));

    run.chain(chord).collect()
}

/// Plays the effect plans on the session device.
#[derive(Clone)]
pub struct ToneSynth {
    device: SharedDevice,
}

impl ToneSynth {
    #[must_use]
    pub const fn new(device: SharedDevice) -> Self {
        Self { device }
    }

    pub fn sparkle(&self) {
        self.play(sparkle_plan());
    }

    pub fn wrong(&self) {
        self.play(wrong_plan());
    }

    pub fn count_blip(&self, n: u32) {
        self.play(count_blip_plan(n));
    }

    pub fn celebration(&self) {
        self.play(celebration_plan());
    }

    fn play(&self, plan: Vec<Tone>) {
        if self.device.is_silent() {
            return;
        }
        let now = self.device.current_time();
        for tone in plan {
            self.device.schedule_tone(tone.shifted(now), None);
        }
    }
}
