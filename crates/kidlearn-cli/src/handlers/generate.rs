//! `generate-clips`: render the manifest into `<key>.mp3` files.
//!
//! Requests run one at a time with a pause in between to stay under the
//! API rate limit. A clip that already exists on disk is skipped, so an
//! interrupted batch can simply be run again. Clips are written to a
//! temporary file and renamed into place, so a clip on disk is always
//! complete.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use crate::elevenlabs::{ClipSynthesizer, ElevenLabsClient};
use crate::error::GenerateError;
use crate::manifest::Manifest;

/// Arguments of `generate-clips`.
#[derive(Debug, Clone)]
pub struct GenerateArgs {
    pub out: PathBuf,
    pub voice: String,
    pub api_key: Option<String>,
    pub manifest: Option<PathBuf>,
    pub delay: Duration,
    pub model: String,
    pub dry_run: bool,
}

/// Outcome counts of one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateSummary {
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Execute the generate-clips command.
pub async fn execute(args: GenerateArgs) -> Result<()> {
    let manifest = Manifest::load(args.manifest.as_deref())?;

    if args.dry_run {
        for (key, text) in manifest.iter() {
            println!("{key}.mp3\t{text}");
        }
        println!(
            "{} clips, {} characters",
            manifest.len(),
            manifest.char_count()
        );
        return Ok(());
    }

    let api_key = args.api_key.ok_or(GenerateError::MissingApiKey)?;
    let client = ElevenLabsClient::new(api_key, &args.voice, &args.model);

    println!();
    println!("  Generating {} clips with ElevenLabs", manifest.len());
    println!("    Voice:  {}", client.voice_id());
    println!("    Output: {}", args.out.display());
    println!();

    let bar = progress_bar(manifest.len());
    let summary = run(&client, &manifest, &args.out, args.delay, &bar).await?;
    bar.finish_and_clear();

    println!();
    println!(
        "  Done: {} generated, {} skipped, {} failed",
        summary.generated, summary.skipped, summary.failed
    );
    println!("  Files saved to: {}", args.out.display());
    Ok(())
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        bar.set_style(style.progress_chars("█▓░"));
    }
    bar
}

/// Render every missing clip of `manifest` into `out`.
///
/// Only failing to create `out` aborts the batch; a failed clip is logged,
/// counted and left absent.
pub async fn run(
    synth: &dyn ClipSynthesizer,
    manifest: &Manifest,
    out: &Path,
    delay: Duration,
    bar: &ProgressBar,
) -> Result<GenerateSummary, GenerateError> {
    tokio::fs::create_dir_all(out).await?;

    let mut summary = GenerateSummary::default();
    let mut requested = false;

    for (key, text) in manifest.iter() {
        bar.set_message(key.to_string());
        let path = out.join(format!("{key}.mp3"));

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!(key, "Clip exists, skipping");
            summary.skipped += 1;
            bar.inc(1);
            continue;
        }

        if requested && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        requested = true;

        match render(synth, text, &path).await {
            Ok(bytes) => {
                bar.println(format!("  ✓ {key}.mp3 ({text})"));
                tracing::debug!(key, bytes, "Clip generated");
                summary.generated += 1;
            }
            Err(e) => {
                bar.println(format!("  ✗ {key}: {e}"));
                tracing::warn!(key, error = %e, "Clip generation failed");
                summary.failed += 1;
            }
        }
        bar.inc(1);
    }

    tracing::info!(
        generated = summary.generated,
        skipped = summary.skipped,
        failed = summary.failed,
        "Clip generation finished"
    );
    Ok(summary)
}

async fn render(
    synth: &dyn ClipSynthesizer,
    text: &str,
    path: &Path,
) -> Result<usize, GenerateError> {
    let audio = synth.synthesize(text).await?;
    let len = audio.len();
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || persist_clip(&path, &audio))
        .await
        .map_err(std::io::Error::other)??;
    Ok(len)
}

/// Write `audio` next to `path` and rename it into place.
fn persist_clip(path: &Path, audio: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(audio)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;

    /// Returns the text as the "audio"; fails for texts listed in `fail`.
    #[derive(Default)]
    struct FakeSynth {
        fail: Vec<&'static str>,
        requests: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ClipSynthesizer for FakeSynth {
        async fn synthesize(&self, text: &str) -> Result<Bytes, GenerateError> {
            self.requests.lock().unwrap().push(text.to_string());
            if self.fail.contains(&text) {
                return Err(GenerateError::Http {
                    status: 401,
                    body: "invalid_api_key".into(),
                });
            }
            Ok(Bytes::from(text.as_bytes().to_vec()))
        }
    }

    fn manifest() -> Manifest {
        Manifest::from_json(r#"{"letter-A": "a", "letter-B": "be", "num-1": "uno"}"#).unwrap()
    }

    #[tokio::test]
    async fn skips_existing_and_counts_failures() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("letter-A.mp3"), b"old").unwrap();
        let synth = FakeSynth {
            fail: vec!["uno"],
            ..FakeSynth::default()
        };

        let summary = run(
            &synth,
            &manifest(),
            dir.path(),
            Duration::ZERO,
            &ProgressBar::hidden(),
        )
        .await
        .unwrap();

        assert_eq!(
            summary,
            GenerateSummary {
                generated: 1,
                skipped: 1,
                failed: 1
            }
        );
        assert_eq!(*synth.requests.lock().unwrap(), ["be", "uno"]);
        assert_eq!(std::fs::read(dir.path().join("letter-A.mp3")).unwrap(), b"old");
        assert_eq!(std::fs::read(dir.path().join("letter-B.mp3")).unwrap(), b"be");
        assert!(!dir.path().join("num-1.mp3").exists());
    }

    #[tokio::test]
    async fn second_run_only_retries_failures() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("audio");
        let failing = FakeSynth {
            fail: vec!["uno"],
            ..FakeSynth::default()
        };
        run(&failing, &manifest(), &out, Duration::ZERO, &ProgressBar::hidden())
            .await
            .unwrap();

        let healthy = FakeSynth::default();
        let summary = run(&healthy, &manifest(), &out, Duration::ZERO, &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(summary.generated, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(*healthy.requests.lock().unwrap(), ["uno"]);
    }

    #[test]
    fn persisted_clip_is_complete_and_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("letter-A.mp3");

        persist_clip(&path, b"complete clip").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"complete clip");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn failed_persist_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("letter-A.mp3")).unwrap();
        std::fs::write(dir.path().join("letter-A.mp3").join("keep"), b"x").unwrap();
        let blocked = dir.path().join("letter-A.mp3");

        assert!(persist_clip(&blocked, b"partial").is_err());

        // Only the blocking directory remains; no temporary or final file.
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, ["letter-A.mp3"]);
        assert!(blocked.is_dir());
    }

    #[tokio::test]
    async fn failed_render_leaves_key_for_the_next_run() {
        let dir = tempfile::tempdir().unwrap();
        let synth = FakeSynth {
            fail: vec!["be"],
            ..FakeSynth::default()
        };

        let summary = run(&synth, &manifest(), dir.path(), Duration::ZERO, &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        let mut names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, ["letter-A.mp3", "num-1.mp3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_between_requests() {
        let dir = tempfile::tempdir().unwrap();
        let synth = FakeSynth::default();
        let started = tokio::time::Instant::now();

        run(
            &synth,
            &manifest(),
            dir.path(),
            Duration::from_millis(550),
            &ProgressBar::hidden(),
        )
        .await
        .unwrap();

        // Three requests, two pauses.
        assert!(started.elapsed() >= Duration::from_millis(1_100));
        assert!(started.elapsed() < Duration::from_millis(1_650));
    }
}
