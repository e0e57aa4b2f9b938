//! Serialized speech queue.
//!
//! A single worker task drains an unbounded channel of jobs, so utterances
//! are spoken strictly in FIFO order and never overlap. Every job carries the
//! queue epoch it was submitted in; [`SpeechQueue::interrupt`] bumps the
//! epoch, which turns everything already queued into a no-op and cancels the
//! job in flight. A single job can also be cancelled through the token it
//! was submitted with, leaving the rest of the queue untouched.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::{SpeechSynthesizer, SystemVoice, Utterance, VoiceSelector};
use crate::config::SpeechConfig;

/// How a queued utterance ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// Spoken to the end.
    Completed,
    /// The synthesizer reported an error.
    Failed,
    /// Dropped or cut off by [`SpeechQueue::interrupt`] / [`SpeechQueue::cancel_all`].
    Interrupted,
    /// Gave up after the per-utterance time budget.
    TimedOut,
}

/// Resolves once the corresponding utterance leaves the queue.
#[derive(Debug)]
#[must_use = "a ticket does nothing unless awaited; drop it to fire and forget"]
pub struct SpeechTicket {
    rx: oneshot::Receiver<SpeechOutcome>,
}

impl Future for SpeechTicket {
    type Output = SpeechOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(SpeechOutcome::Interrupted))
    }
}

struct Job {
    utterance: Utterance,
    epoch: u64,
    token: CancellationToken,
    done: oneshot::Sender<SpeechOutcome>,
}

struct Shared {
    synth: Arc<dyn SpeechSynthesizer>,
    selector: VoiceSelector,
    config: SpeechConfig,
    epoch: AtomicU64,
    current: Mutex<Option<CancellationToken>>,
    speaking: AtomicBool,
    pending: AtomicUsize,
    voice_wait_done: AtomicBool,
}

/// Handle to the speech worker. Cheap to clone; the worker stops once every
/// handle is dropped.
#[derive(Clone)]
pub struct SpeechQueue {
    tx: mpsc::UnboundedSender<Job>,
    shared: Arc<Shared>,
}

impl SpeechQueue {
    /// Spawn the worker on the current tokio runtime.
    #[must_use]
    pub fn new(synth: Arc<dyn SpeechSynthesizer>, config: SpeechConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            selector: VoiceSelector::new(&config.voice_rules),
            synth,
            config,
            epoch: AtomicU64::new(0),
            current: Mutex::new(None),
            speaking: AtomicBool::new(false),
            pending: AtomicUsize::new(0),
            voice_wait_done: AtomicBool::new(false),
        });

        tokio::spawn(Shared::run(Arc::clone(&shared), rx));
        Self { tx, shared }
    }

    /// Append an utterance to the queue.
    pub fn enqueue(&self, utterance: Utterance) -> SpeechTicket {
        self.submit(utterance, CancellationToken::new())
    }

    /// Append an utterance that is dropped, or cut off if already speaking,
    /// once `cancel` fires. Other queued utterances are not affected.
    pub fn enqueue_cancellable(
        &self,
        utterance: Utterance,
        cancel: &CancellationToken,
    ) -> SpeechTicket {
        self.submit(utterance, cancel.child_token())
    }

    fn submit(&self, utterance: Utterance, token: CancellationToken) -> SpeechTicket {
        let (done, rx) = oneshot::channel();
        let job = Job {
            utterance,
            epoch: self.shared.epoch.load(Ordering::SeqCst),
            token,
            done,
        };

        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        if let Err(mpsc::error::SendError(job)) = self.tx.send(job) {
            self.shared.pending.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!(text = %job.utterance.text, "Speech worker is gone, dropping utterance");
        }
        SpeechTicket { rx }
    }

    /// Cut off current speech, drop everything queued, then enqueue
    /// `utterance`.
    pub fn interrupt(&self, utterance: Utterance) -> SpeechTicket {
        self.cancel_all();
        self.enqueue(utterance)
    }

    /// Cut off current speech and drop everything queued.
    pub fn cancel_all(&self) {
        let epoch = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(token) = self.shared.current_token() {
            token.cancel();
        }
        tracing::debug!(epoch, "Speech queue interrupted");
    }

    /// Whether an utterance is being spoken right now.
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.shared.speaking.load(Ordering::SeqCst)
    }

    /// Number of jobs waiting behind the current one.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }
}

impl Shared {
    async fn run(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<Job>) {
        while let Some(job) = rx.recv().await {
            self.pending.fetch_sub(1, Ordering::SeqCst);

            if job.epoch != self.epoch.load(Ordering::SeqCst) || job.token.is_cancelled() {
                let _ = job.done.send(SpeechOutcome::Interrupted);
                continue;
            }

            let token = job.token.clone();
            self.set_current(Some(token.clone()));
            // An interrupt may have landed between the epoch check and
            // publishing the token.
            if job.epoch != self.epoch.load(Ordering::SeqCst) {
                self.set_current(None);
                let _ = job.done.send(SpeechOutcome::Interrupted);
                continue;
            }

            self.speaking.store(true, Ordering::SeqCst);
            let outcome = self.speak(&job.utterance, &token).await;
            self.speaking.store(false, Ordering::SeqCst);
            self.set_current(None);

            tracing::debug!(text = %job.utterance.text, ?outcome, "Utterance finished");
            let _ = job.done.send(outcome);
        }
        tracing::debug!("Speech worker stopped");
    }

    async fn speak(&self, utterance: &Utterance, token: &CancellationToken) -> SpeechOutcome {
        let limit = self.config.utterance_timeout(&utterance.text);

        let attempt = async {
            let voice = self.resolve_voice().await;
            tokio::time::timeout(limit, self.synth.speak(utterance, voice.as_ref())).await
        };

        tokio::select! {
            biased;
            () = token.cancelled() => {
                // Only the worker stops the synthesizer, so a job queued
                // after the cancellation is never cut off.
                self.synth.cancel();
                SpeechOutcome::Interrupted
            }
            result = attempt => match result {
                Ok(Ok(())) => SpeechOutcome::Completed,
                Ok(Err(e)) => {
                    tracing::warn!(text = %utterance.text, error = %e, "Speech failed");
                    SpeechOutcome::Failed
                }
                Err(_) => {
                    tracing::warn!(text = %utterance.text, ?limit, "Speech timed out");
                    self.synth.cancel();
                    SpeechOutcome::TimedOut
                }
            },
        }
    }

    /// Pick a voice, waiting once per session for a lazily loaded voice
    /// list.
    async fn resolve_voice(&self) -> Option<SystemVoice> {
        let mut generation = self.synth.subscribe_voices();
        let mut voices = self.synth.voices();

        if voices.is_empty()
            && self.synth.is_available()
            && !self.voice_wait_done.swap(true, Ordering::SeqCst)
        {
            let wait = self.config.voice_wait();
            tracing::debug!(?wait, "Waiting for the voice list");
            if tokio::time::timeout(wait, generation.changed()).await.is_err() {
                tracing::debug!("Voice list still empty, using the platform default");
            }
            voices = self.synth.voices();
        }

        let current = *generation.borrow_and_update();
        self.selector.select(&voices, current)
    }

    fn current_token(&self) -> Option<CancellationToken> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_current(&self, token: Option<CancellationToken>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = token;
    }
}
