//! Errors of the clip generation tool.

use thiserror::Error;

/// Failure while building the manifest or rendering one clip.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The API answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never got an answer.
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Reading the manifest or writing a clip failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The manifest override file is not a JSON object of strings.
    #[error("Invalid manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    /// No API key was given.
    #[error("Missing ELEVENLABS_API_KEY (set it in the environment, .env.local or pass --api-key)")]
    MissingApiKey,
}
