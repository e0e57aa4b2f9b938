//! Clip keys and the Spanish fallback tables.
//!
//! A [`ClipKey`] names one pre-rendered clip. The same key is used as the
//! cache key, as the asset file stem (`<key>.mp3`) and as the manifest key
//! of the clip generator, so the three can never drift apart.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical name of a pre-rendered clip, e.g. `letter-A` or `count-3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipKey(String);

impl ClipKey {
    pub const CELEBRATE_STREAK: &'static str = "celebrate-streak";
    pub const TRY_AGAIN: &'static str = "try-again";
    pub const CORRECT: &'static str = "correct";
    pub const NAV_LETTERS: &'static str = "nav-letters";
    pub const NAV_NUMBERS: &'static str = "nav-numbers";
    pub const NAV_WORDS: &'static str = "nav-words";
    pub const NAV_MENU: &'static str = "nav-menu";

    /// Number of `celebrate-<n>` clips.
    pub const CELEBRATION_COUNT: usize = 7;

    /// `letter-<L>`, letter uppercased.
    #[must_use]
    pub fn letter(letter: &str) -> Self {
        Self(format!("letter-{}", letter.trim().to_uppercase()))
    }

    /// `word-<W>`, whitespace removed.
    #[must_use]
    pub fn word(word: &str) -> Self {
        Self(format!("word-{}", strip_whitespace(word)))
    }

    /// `de-<W>`, the "de <word>" phrase used after a letter.
    #[must_use]
    pub fn de_word(word: &str) -> Self {
        Self(format!("de-{}", strip_whitespace(word)))
    }

    /// `num-<n>`, the labeled number name.
    #[must_use]
    pub fn number(n: u32) -> Self {
        Self(format!("num-{n}"))
    }

    /// `count-<n>`, the bare numeral used while counting.
    #[must_use]
    pub fn count(n: u32) -> Self {
        Self(format!("count-{n}"))
    }

    /// `celebrate-<n>`, `n` in `1..=7`.
    #[must_use]
    pub fn celebrate(n: usize) -> Self {
        Self(format!("celebrate-{n}"))
    }

    /// Any other fixed phrase (`try-again`, `nav-menu`, ...).
    #[must_use]
    pub fn phrase(name: &str) -> Self {
        Self(name.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Relative asset path, `<key>.mp3`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.mp3", self.0)
    }
}

impl fmt::Display for ClipKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClipKey {
    fn from(value: &str) -> Self {
        Self::phrase(value)
    }
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Clips worth fetching at start-up so the first feedback and count
/// sequence do not wait on the network.
#[must_use]
pub fn critical_keys() -> Vec<ClipKey> {
    let mut keys: Vec<ClipKey> = (1..=ClipKey::CELEBRATION_COUNT)
        .map(ClipKey::celebrate)
        .collect();
    keys.push(ClipKey::phrase(ClipKey::TRY_AGAIN));
    keys.push(ClipKey::phrase(ClipKey::CORRECT));
    keys.extend((1..=10).map(ClipKey::count));
    keys.extend((1..=5).map(ClipKey::number));
    keys
}

// ── Spanish fallback tables ────────────────────────────────────────

const LETTER_NAMES: &[(&str, &str)] = &[
    ("A", "a"),
    ("B", "be"),
    ("C", "ce"),
    ("D", "de"),
    ("E", "e"),
    ("F", "efe"),
    ("G", "ge"),
    ("H", "hache"),
    ("I", "i"),
    ("J", "jota"),
    ("K", "ka"),
    ("L", "ele"),
    ("M", "eme"),
    ("N", "ene"),
    ("Ñ", "eñe"),
    ("O", "o"),
    ("P", "pe"),
    ("Q", "cu"),
    ("R", "erre"),
    ("S", "ese"),
    ("T", "te"),
    ("U", "u"),
    ("V", "ve"),
    ("W", "doble ve"),
    ("X", "equis"),
    ("Y", "ye"),
    ("Z", "zeta"),
];

const NUMBER_LABELS: &[&str] = &[
    "cero", "uno", "dos", "tres", "cuatro", "cinco", "seis", "siete", "ocho", "nueve", "diez",
];

/// Spoken celebration phrases, index `n - 1` for `celebrate-<n>`.
pub const CELEBRATIONS: [&str; ClipKey::CELEBRATION_COUNT] = [
    "¡Muy bien!",
    "¡Excelente!",
    "¡Bravo!",
    "¡Lo lograste!",
    "¡Fantástico!",
    "¡Genial!",
    "¡Súper!",
];

/// Phrases for a correct answer.
pub const CORRECT_TEXTS: &[&str] = &[
    "¡Muy bien!",
    "¡Correcto!",
    "¡Bravo!",
    "¡Sí!",
    "¡Genial!",
    "¡Súper!",
];

pub const TRY_AGAIN_TEXT: &str = "¡Inténtalo de nuevo!";
pub const STREAK_TEXT: &str = "¡Cinco en raya! ¡Eres increíble!";

/// Spanish name of a letter; unknown letters are spoken as written.
#[must_use]
pub fn letter_name(letter: &str) -> String {
    let upper = letter.trim().to_uppercase();
    LETTER_NAMES
        .iter()
        .find(|(l, _)| *l == upper)
        .map_or_else(|| letter.trim().to_lowercase(), |(_, name)| (*name).to_string())
}

/// Spanish label for `n`; numbers past the table are spoken as digits.
#[must_use]
pub fn number_label(n: u32) -> String {
    usize::try_from(n)
        .ok()
        .and_then(|i| NUMBER_LABELS.get(i))
        .map_or_else(|| n.to_string(), |label| (*label).to_string())
}
