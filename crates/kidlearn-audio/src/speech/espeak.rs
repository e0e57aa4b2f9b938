//! `espeak-ng` backed synthesizer.
//!
//! Each utterance runs one `espeak-ng` child process that plays straight to
//! the default output. The voice list is read once from `espeak-ng --voices`
//! in the background, the same way browsers populate their voice list after
//! start-up.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::{SpeechSynthesizer, SystemVoice, Utterance};
use crate::error::AudioError;

/// espeak-ng default speaking rate in words per minute.
const DEFAULT_WPM: f32 = 175.0;
/// espeak-ng default pitch (0-99).
const DEFAULT_PITCH: f32 = 50.0;

/// Synthesizer that shells out to `espeak-ng`.
pub struct EspeakSynthesizer {
    program: String,
    voices: Mutex<Vec<SystemVoice>>,
    available: AtomicBool,
    generation: watch::Sender<u64>,
    cancel: Mutex<CancellationToken>,
}

impl EspeakSynthesizer {
    /// Create the synthesizer and start loading its voice list on the
    /// current tokio runtime.
    #[must_use]
    pub fn spawn(program: impl Into<String>) -> Arc<Self> {
        let (generation, _) = watch::channel(0);
        let synth = Arc::new(Self {
            program: program.into(),
            voices: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            generation,
            cancel: Mutex::new(CancellationToken::new()),
        });

        let loader = Arc::clone(&synth);
        tokio::spawn(async move { loader.load_voices().await });
        synth
    }

    async fn load_voices(&self) {
        match Command::new(&self.program).arg("--voices").output().await {
            Ok(output) if output.status.success() => {
                let voices = parse_voice_list(&String::from_utf8_lossy(&output.stdout));
                tracing::info!(program = %self.program, count = voices.len(), "Loaded speech voices");
                *self.voices.lock().unwrap_or_else(PoisonError::into_inner) = voices;
            }
            Ok(output) => {
                tracing::warn!(program = %self.program, status = %output.status, "Voice listing failed");
            }
            Err(e) => {
                tracing::warn!(program = %self.program, error = %e, "Speech synthesizer not available");
                self.available.store(false, Ordering::SeqCst);
            }
        }
        // Bump even on failure so nobody keeps waiting for the list.
        self.generation.send_modify(|g| *g += 1);
    }

    fn current_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for EspeakSynthesizer {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn voices(&self) -> Vec<SystemVoice> {
        self.voices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn subscribe_voices(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    async fn speak(
        &self,
        utterance: &Utterance,
        voice: Option<&SystemVoice>,
    ) -> Result<(), AudioError> {
        if !self.is_available() {
            return Err(AudioError::SynthesisError(format!(
                "{} is not installed",
                self.program
            )));
        }

        let token = self.current_token();
        let mut child = Command::new(&self.program)
            .args(espeak_args(utterance, voice))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        tracing::debug!(text = %utterance.text, voice = ?voice.map(|v| &v.id), "Speaking");

        let finished = tokio::select! {
            status = child.wait() => Some(status),
            () = token.cancelled() => None,
        };

        match finished {
            Some(status) => {
                let status = status?;
                if status.success() {
                    Ok(())
                } else {
                    Err(AudioError::SynthesisError(format!(
                        "{} exited with {status}",
                        self.program
                    )))
                }
            }
            None => {
                if let Err(e) = child.kill().await {
                    tracing::debug!(error = %e, "Failed to kill espeak-ng after cancel");
                }
                Err(AudioError::Cancelled)
            }
        }
    }

    fn cancel(&self) {
        let mut token = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        token.cancel();
        *token = CancellationToken::new();
    }
}

/// Command-line arguments for one utterance.
///
/// Rate and pitch are multipliers of the espeak defaults (175 wpm, pitch
/// 50). Without a selected voice the language family of the utterance is
/// used, e.g. `es` for `es-US`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn espeak_args(utterance: &Utterance, voice: Option<&SystemVoice>) -> Vec<String> {
    let voice_id = voice.map_or_else(
        || {
            utterance
                .lang
                .split('-')
                .next()
                .unwrap_or_default()
                .to_lowercase()
        },
        |v| v.id.clone(),
    );
    let wpm = (DEFAULT_WPM * utterance.rate).clamp(80.0, 450.0).round() as i32;
    let pitch = (DEFAULT_PITCH * utterance.pitch).clamp(0.0, 99.0).round() as i32;

    vec![
        "-v".to_string(),
        voice_id,
        "-s".to_string(),
        wpm.to_string(),
        "-p".to_string(),
        pitch.to_string(),
        "--".to_string(),
        utterance.text.clone(),
    ]
}

/// Parse the table printed by `espeak-ng --voices`.
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  es              --/M      Spanish_(Spain)    roa/es
/// ```
#[must_use]
pub fn parse_voice_list(output: &str) -> Vec<SystemVoice> {
    output
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("Pty"))
        .skip(1)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let _priority = fields.next()?;
            let lang = fields.next()?;
            let _age_gender = fields.next()?;
            let name = fields.next()?;
            Some(SystemVoice {
                id: lang.to_string(),
                name: name.replace('_', " "),
                lang: lang.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  en-us           --/M      English_(America)  gmw/en-US            (en 3)
 5  es              --/M      Spanish_(Spain)    roa/es
 5  es-419          --/M      Spanish_(Latin_America) roa/es-419      (es-mx 6)
";

    #[test]
    fn parses_voice_table() {
        let voices = parse_voice_list(LISTING);
        assert_eq!(voices.len(), 3);
        assert_eq!(voices[2].id, "es-419");
        assert_eq!(voices[2].name, "Spanish (Latin America)");
        assert_eq!(voices[1].lang, "es");
    }

    #[test]
    fn empty_listing_has_no_voices() {
        assert!(parse_voice_list("").is_empty());
        assert!(parse_voice_list("espeak-ng: command failed\n").is_empty());
    }

    #[test]
    fn maps_rate_and_pitch() {
        let utterance = Utterance::new("be", 0.80, 1.2, "es-US");
        let args = espeak_args(&utterance, None);
        assert_eq!(args, ["-v", "es", "-s", "140", "-p", "60", "--", "be"]);
    }

    #[test]
    fn selected_voice_overrides_language() {
        let utterance = Utterance::new("uno", 3.0, 3.0, "es-US");
        let voice = SystemVoice {
            id: "es-419".into(),
            name: "Spanish (Latin America)".into(),
            lang: "es-419".into(),
        };
        let args = espeak_args(&utterance, Some(&voice));
        assert_eq!(args[1], "es-419");
        assert_eq!(args[3], "450");
        assert_eq!(args[5], "99");
    }

    #[tokio::test]
    async fn missing_program_marks_synthesizer_unavailable() {
        let synth = EspeakSynthesizer::spawn("kidlearn-no-such-speech-program");
        let mut generation = synth.subscribe_voices();
        generation.changed().await.unwrap();

        assert!(!synth.is_available());
        assert!(synth.voices().is_empty());
        let result = synth
            .speak(&Utterance::new("hola", 1.0, 1.0, "es-US"), None)
            .await;
        assert!(matches!(result, Err(AudioError::SynthesisError(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cancel_kills_the_running_child() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::Duration;

        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("slow-speech");
        std::fs::write(
            &program,
            "#!/bin/sh\n[ \"$1\" = \"--voices\" ] && exit 0\nexec sleep 30\n",
        )
        .unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

        let synth = EspeakSynthesizer::spawn(program.to_string_lossy());
        synth.subscribe_voices().changed().await.unwrap();
        assert!(synth.is_available());

        let speaker = Arc::clone(&synth);
        let speaking = tokio::spawn(async move {
            speaker
                .speak(&Utterance::new("hola", 1.0, 1.0, "es-US"), None)
                .await
        });

        let result = tokio::time::timeout(Duration::from_secs(5), async {
            while !speaking.is_finished() {
                synth.cancel();
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            speaking.await.unwrap()
        })
        .await
        .expect("speak should return once cancelled");
        assert!(matches!(result, Err(AudioError::Cancelled)));
    }
}
