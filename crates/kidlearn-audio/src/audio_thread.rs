//! Dedicated audio output thread.
//!
//! `rodio::OutputStream` is `!Send` on some platforms. Rather than using
//! `unsafe impl Send/Sync`, the stream is confined to a single OS thread and
//! every playback request travels there as an [`AudioCommand`].
//!
//! [`RodioDevice`] is the `Send + Sync` proxy the rest of the engine holds.
//! It keeps its own monotonic clock so tones can be scheduled at absolute
//! device times; the audio thread only ever sees ready-to-mix sources.

use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use crate::device::{AudioDevice, Bus, ClipBuffer, Tone};
use crate::error::AudioError;
use crate::playback::{self, BoxedSource};

// ── Commands ───────────────────────────────────────────────────────

/// A command sent to the audio thread.
enum AudioCommand {
    /// Mix a source into the output immediately.
    Play(BoxedSource),

    /// Shut down the audio thread, releasing the output stream.
    Shutdown,
}

// ── Device (Send + Sync proxy) ─────────────────────────────────────

/// [`AudioDevice`] backed by the default rodio output.
pub struct RodioDevice {
    cmd_tx: mpsc::Sender<AudioCommand>,
    thread: Option<thread::JoinHandle<()>>,
    epoch: Instant,
}

impl RodioDevice {
    /// Spawn the audio thread and open the default output device.
    ///
    /// Errors from opening the stream are propagated back through a one-shot
    /// init channel.
    pub fn open() -> Result<Self, AudioError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<AudioCommand>();
        let (init_tx, init_rx) = mpsc::channel::<Result<(), AudioError>>();

        let thread = thread::Builder::new()
            .name("kidlearn-audio".into())
            .spawn(move || Self::run(&cmd_rx, &init_tx))
            .map_err(|e| {
                AudioError::OutputStreamError(format!("failed to spawn audio thread: {e}"))
            })?;

        init_rx.recv().map_err(|_| AudioError::AudioThreadDied)??;
        tracing::info!("Audio output opened");

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
            epoch: Instant::now(),
        })
    }

    fn send(&self, cmd: AudioCommand) -> Result<(), AudioError> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| AudioError::AudioThreadDied)
    }

    // ── Audio thread event loop ────────────────────────────────────

    /// Body of the audio thread. Owns the output stream for its lifetime.
    fn run(cmd_rx: &mpsc::Receiver<AudioCommand>, init_tx: &mpsc::Sender<Result<(), AudioError>>) {
        let (stream, handle) = match rodio::OutputStream::try_default() {
            Ok(pair) => pair,
            Err(e) => {
                let _ = init_tx.send(Err(AudioError::OutputStreamError(e.to_string())));
                return;
            }
        };

        if init_tx.send(Ok(())).is_err() {
            return;
        }

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                AudioCommand::Play(source) => {
                    if let Err(e) = handle.play_raw(source) {
                        tracing::warn!(error = %e, "Failed to start source");
                    }
                }
                AudioCommand::Shutdown => break,
            }
        }

        drop(stream);
        tracing::debug!("Audio thread shutting down");
    }
}

impl AudioDevice for RodioDevice {
    fn current_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn schedule_tone(&self, tone: Tone, bus: Option<&Bus>) {
        let source = playback::tone_source(tone, bus.cloned(), self.current_time());
        if let Err(e) = self.send(AudioCommand::Play(source)) {
            tracing::debug!(error = %e, frequency = tone.frequency, "Dropped tone");
        }
    }

    fn play_clip(&self, clip: &ClipBuffer, volume: f32) -> Result<(), AudioError> {
        self.send(AudioCommand::Play(playback::clip_source(clip, volume)))
    }

    fn decode(&self, bytes: &[u8]) -> Result<ClipBuffer, AudioError> {
        playback::decode_clip(bytes)
    }
}

impl Drop for RodioDevice {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}
