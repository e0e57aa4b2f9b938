//! Audio engine error types.

use std::time::Duration;

/// Errors that can occur inside the audio engine.
///
/// Public playback operations on [`Narrator`](crate::narrator::Narrator)
/// never surface these for expected failures (absent clip, no voices, silent
/// device); they are logged and the call degrades to silence. They are
/// returned from device construction and from the lower-level ports.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// Failed to open the audio output stream.
    #[error("Failed to open audio output stream: {0}")]
    OutputStreamError(String),

    /// The dedicated audio thread is gone.
    #[error("Audio thread is not running")]
    AudioThreadDied,

    /// No audio output is available (headless session).
    #[error("No audio output available")]
    Unavailable,

    /// Failed to decode a clip payload.
    #[error("Failed to decode clip: {0}")]
    DecodeError(String),

    /// The clip server answered with a non-success status.
    #[error("Clip request for '{key}' failed with HTTP {status}")]
    HttpStatus { key: String, status: u16 },

    /// The clip request never produced a response.
    #[error("Clip request for '{key}' failed: {message}")]
    Transport { key: String, message: String },

    /// An operation exceeded its time budget.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The platform speech synthesizer is missing or refused the request.
    #[error("Speech synthesis failed: {0}")]
    SynthesisError(String),

    /// A configuration document is malformed or holds out-of-range values.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error (clip directory, synthesizer process).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation was cancelled.
    #[error("Audio operation cancelled")]
    Cancelled,
}

impl AudioError {
    /// Whether retrying the same request later could succeed.
    ///
    /// Server errors, rate limiting, transport failures and timeouts are
    /// transient. Missing assets and undecodable payloads are not.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Self::Transport { .. } | Self::Timeout(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16) -> AudioError {
        AudioError::HttpStatus {
            key: "letter-A".to_string(),
            status,
        }
    }

    #[test]
    fn server_errors_are_transient() {
        assert!(status(500).is_transient());
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
    }

    #[test]
    fn client_errors_are_permanent() {
        assert!(!status(403).is_transient());
        assert!(!AudioError::DecodeError("bad frame".into()).is_transient());
    }

    #[test]
    fn timeouts_and_transport_are_transient() {
        assert!(AudioError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(
            AudioError::Transport {
                key: "num-1".into(),
                message: "connection reset".into()
            }
            .is_transient()
        );
    }
}
