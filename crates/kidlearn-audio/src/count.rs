//! Narrated "count together" sequence.
//!
//! Counts `1..=up_to`: each step fires the caller's step callback, plays
//! the ladder blip and speaks the bare numeral, then pauses briefly before
//! the next one. After the last step the labeled number name is played and
//! the done callback fires exactly once. Every boundary checks the
//! sequence's [`CancellationToken`].

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::narrator::{Narrator, NumberStyle, Playback};

/// How a count sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountOutcome {
    /// Every step ran and the done callback fired.
    Completed,
    /// Cancelled before the done callback.
    Cancelled,
}

/// Handle to a running count sequence.
///
/// Dropping the handle detaches the sequence; call
/// [`cancel`](Self::cancel) to stop it.
#[derive(Debug)]
pub struct CountSequence {
    token: CancellationToken,
    task: JoinHandle<CountOutcome>,
}

impl CountSequence {
    pub(crate) fn spawn<S, D>(narrator: Arc<Narrator>, up_to: u32, on_step: S, on_done: D) -> Self
    where
        S: FnMut(u32) + Send + 'static,
        D: FnOnce() + Send + 'static,
    {
        let token = CancellationToken::new();
        let task = tokio::spawn(run(narrator, up_to, token.clone(), on_step, on_done));
        Self { token, task }
    }

    /// Stop the sequence at the next boundary. Idempotent, and harmless
    /// after the sequence has finished.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!("Count sequence cancelled");
        }
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the sequence task has ended, completed or cancelled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the sequence to end.
    pub async fn wait(self) -> CountOutcome {
        self.task.await.unwrap_or(CountOutcome::Cancelled)
    }
}

/// Sleep unless cancelled first. `false` means cancelled.
async fn pause(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        biased;
        () = token.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

/// Play a number and wait for it to be heard. `None` means cancelled.
async fn say_number(
    narrator: &Narrator,
    token: &CancellationToken,
    n: u32,
    style: NumberStyle,
) -> Option<()> {
    // A cancelled numeral is dropped from the speech queue through the
    // token; speech queued by anyone else is left alone.
    let played = tokio::select! {
        biased;
        () = token.cancelled() => return None,
        played = narrator.play_number_cancellable(n, style, token) => played,
    };

    // A clip resolves as soon as it starts; hold the pace until it ends.
    if let Playback::Clip { duration } = played {
        if !pause(token, duration).await {
            return None;
        }
    }
    Some(())
}

async fn run<S, D>(
    narrator: Arc<Narrator>,
    up_to: u32,
    token: CancellationToken,
    mut on_step: S,
    on_done: D,
) -> CountOutcome
where
    S: FnMut(u32) + Send + 'static,
    D: FnOnce() + Send + 'static,
{
    let pacing = narrator.config().count.clone();
    tracing::debug!(up_to, "Count sequence started");

    if !pause(&token, pacing.initial_delay()).await {
        return CountOutcome::Cancelled;
    }

    for n in 1..=up_to {
        if token.is_cancelled() {
            return CountOutcome::Cancelled;
        }
        on_step(n);
        narrator.tones().count_blip(n);

        if say_number(&narrator, &token, n, NumberStyle::Bare).await.is_none()
            || !pause(&token, pacing.breath()).await
        {
            return CountOutcome::Cancelled;
        }
    }

    if token.is_cancelled()
        || say_number(&narrator, &token, up_to, NumberStyle::Labeled)
            .await
            .is_none()
        || token.is_cancelled()
    {
        return CountOutcome::Cancelled;
    }

    on_done();
    tracing::debug!(up_to, "Count sequence completed");
    CountOutcome::Completed
}
