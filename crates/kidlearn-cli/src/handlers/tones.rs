//! `tones`: play each sound effect once.

use std::time::Duration;

use anyhow::Result;
use kidlearn_audio::Narrator;

const GAP: Duration = Duration::from_millis(900);

/// Execute the tones command.
pub async fn execute(narrator: &Narrator) -> Result<()> {
    let tones = narrator.tones();

    println!("sparkle");
    tones.sparkle();
    tokio::time::sleep(GAP).await;

    println!("wrong");
    tones.wrong();
    tokio::time::sleep(GAP).await;

    for n in 1..=10 {
        println!("count blip {n}");
        tones.count_blip(n);
        tokio::time::sleep(Duration::from_millis(300)).await;
    }
    tokio::time::sleep(GAP).await;

    println!("celebration");
    tones.celebration();
    tokio::time::sleep(Duration::from_secs(2)).await;
    Ok(())
}
