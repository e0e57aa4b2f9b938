//! `music`: play the background loop for a while, then fade out.

use std::time::Duration;

use anyhow::Result;
use kidlearn_audio::Narrator;

/// Execute the music command.
pub async fn execute(narrator: &Narrator, seconds: u64) -> Result<()> {
    let music = narrator.music();
    if !music.start() {
        println!("Background music unavailable (no sound output)");
        return Ok(());
    }
    println!("Playing background music for {seconds}s (Ctrl+C to stop early)");

    tokio::select! {
        () = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    music.stop();
    let config = &narrator.config().music;
    tokio::time::sleep(Duration::from_secs_f64(
        config.fade_out_secs.max(config.release_after_secs),
    ))
    .await;
    println!("Stopped after {} passes", music.passes_scheduled());
    Ok(())
}
