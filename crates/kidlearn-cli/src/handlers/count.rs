//! `count`: run the narrated count sequence, cancelled by Ctrl+C.

use std::sync::Arc;

use anyhow::Result;
use kidlearn_audio::{CountOutcome, Narrator};

/// Execute the count command.
pub async fn execute(narrator: &Arc<Narrator>, up_to: u32) -> Result<()> {
    let sequence = narrator.start_count_sequence(
        up_to,
        |n| println!("  {n}"),
        || println!("  ¡Listo!"),
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    while !sequence.is_finished() {
        tokio::select! {
            () = tokio::time::sleep(std::time::Duration::from_millis(50)) => {}
            _ = &mut ctrl_c, if !sequence.is_cancelled() => sequence.cancel(),
        }
    }

    if sequence.wait().await == CountOutcome::Cancelled {
        println!("  (cancelled)");
    }
    Ok(())
}
