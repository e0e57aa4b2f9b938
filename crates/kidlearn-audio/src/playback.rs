//! rodio sources and decoding for [`RodioDevice`](crate::audio_thread::RodioDevice).
//!
//! Notes are rendered sample by sample from their [`Tone`] description, so
//! the envelope and any bus automation are evaluated on the device clock
//! rather than baked in at scheduling time.

use std::io::Cursor;
use std::time::Duration;

use rodio::Source;

use crate::device::{Bus, ClipBuffer, Tone};
use crate::error::AudioError;

/// Sample rate used for synthesized notes.
pub const TONE_SAMPLE_RATE: u32 = 44_100;

/// Bus gain is re-read every this many samples (~6 ms at 44.1 kHz).
const BUS_REFRESH_SAMPLES: u64 = 256;

/// Boxed source type accepted by the audio thread.
pub type BoxedSource = Box<dyn Source<Item = f32> + Send>;

/// A mono oscillator that renders one [`Tone`].
pub struct ToneSource {
    tone: Tone,
    bus: Option<Bus>,
    sample_rate: u32,
    position: u64,
    total: u64,
    phase: f64,
    bus_gain: f32,
}

impl ToneSource {
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(tone: Tone, bus: Option<Bus>, sample_rate: u32) -> Self {
        let total = (tone.stop.max(0.0) * f64::from(sample_rate)).ceil() as u64;
        Self {
            tone,
            bus,
            sample_rate,
            position: 0,
            total,
            phase: 0.0,
            bus_gain: 1.0,
        }
    }
}

impl Iterator for ToneSource {
    type Item = f32;

    #[allow(clippy::cast_precision_loss)]
    fn next(&mut self) -> Option<f32> {
        if self.position >= self.total {
            return None;
        }

        let rate = f64::from(self.sample_rate);
        let elapsed = self.position as f64 / rate;

        if let Some(bus) = &self.bus {
            if self.position % BUS_REFRESH_SAMPLES == 0 {
                self.bus_gain = bus.gain_at(self.tone.start + elapsed);
            }
        }

        let sample =
            self.tone.waveform.sample(self.phase) * self.tone.gain_at(elapsed) * self.bus_gain;

        self.phase = (self.phase + f64::from(self.tone.frequency) / rate).fract();
        self.position += 1;
        Some(sample)
    }
}

impl Source for ToneSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f64(self.tone.stop.max(0.0)))
    }
}

/// Build the source for a scheduled note, delayed until `tone.start`.
#[must_use]
pub fn tone_source(tone: Tone, bus: Option<Bus>, now: f64) -> BoxedSource {
    let delay = Duration::from_secs_f64((tone.start - now).max(0.0));
    Box::new(ToneSource::new(tone, bus, TONE_SAMPLE_RATE).delay(delay))
}

/// Build the source for a decoded clip at the given volume.
#[must_use]
pub fn clip_source(clip: &ClipBuffer, volume: f32) -> BoxedSource {
    let buffer = rodio::buffer::SamplesBuffer::new(
        clip.channels(),
        clip.sample_rate(),
        clip.samples().to_vec(),
    );
    Box::new(buffer.amplify(volume.clamp(0.0, 1.0)))
}

/// Decode an MP3/WAV payload into interleaved f32 samples.
pub fn decode_clip(bytes: &[u8]) -> Result<ClipBuffer, AudioError> {
    let decoder = rodio::Decoder::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| AudioError::DecodeError(e.to_string()))?;

    let channels = decoder.channels();
    let sample_rate = decoder.sample_rate();
    let samples: Vec<f32> = decoder.convert_samples().collect();

    if samples.is_empty() {
        return Err(AudioError::DecodeError("payload contains no audio".to_string()));
    }

    tracing::debug!(
        channels,
        sample_rate,
        samples = samples.len(),
        "Decoded clip"
    );
    Ok(ClipBuffer::new(samples, channels, sample_rate))
}
