//! `say`: play one prompt through the narrator.

use anyhow::Result;
use kidlearn_audio::{ClipKey, Narrator, NumberStyle, Playback, Prosody};

use crate::commands::SayCommand;

/// Execute the say command.
pub async fn execute(narrator: &Narrator, what: SayCommand) -> Result<()> {
    let played = match what {
        SayCommand::Letter { letter } => narrator.play_letter(&letter).await,
        SayCommand::Word { word } => narrator.play_word(&word).await,
        SayCommand::LetterWord { letter, word } => narrator.play_letter_word(&letter, &word).await,
        SayCommand::Number { n, bare } => {
            let style = if bare {
                NumberStyle::Bare
            } else {
                NumberStyle::Labeled
            };
            narrator.play_number(n, style).await
        }
        SayCommand::Phrase { key, fallback } => {
            narrator
                .play_phrase(&ClipKey::phrase(&key), &fallback, Prosody::default())
                .await
        }
        SayCommand::Correct => narrator.play_correct().await,
        SayCommand::TryAgain => narrator.play_try_again().await,
        SayCommand::Celebrate => narrator.play_celebration_voice().await,
    };

    // A clip resolves when it starts; let it finish before exiting.
    if let Playback::Clip { duration } = played {
        tokio::time::sleep(duration).await;
    }
    println!("{}", describe(played));
    Ok(())
}

fn describe(played: Playback) -> String {
    match played {
        Playback::Clip { duration } => format!("clip ({} ms)", duration.as_millis()),
        Playback::Speech(outcome) => format!("speech ({outcome:?})"),
    }
}
