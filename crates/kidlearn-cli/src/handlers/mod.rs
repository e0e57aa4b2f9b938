//! Command handlers.
//!
//! Handlers are thin: they take the composed [`Narrator`](kidlearn_audio::Narrator)
//! or the generation inputs, run one operation and print what happened.

pub mod count;
pub mod generate;
pub mod music;
pub mod say;
pub mod tones;
