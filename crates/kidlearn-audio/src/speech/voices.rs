//! Voice selection heuristics.

use std::sync::{Mutex, PoisonError};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::SystemVoice;

/// One voice preference. Rules are evaluated in order; the first rule with
/// any matching voice wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VoiceRule {
    /// Name contains `name` and language equals `lang`.
    NameAndLang { name: String, lang: String },

    /// Name contains `name` and language starts with `prefix`.
    NameAndLangPrefix { name: String, prefix: String },

    /// Name matches the case-insensitive regular expression.
    NamePattern { pattern: String },

    /// Language equals `lang`.
    Lang { lang: String },

    /// Language starts with `prefix`.
    LangPrefix { prefix: String },
}

impl VoiceRule {
    /// Preference list for Latin-American Spanish.
    #[must_use]
    pub fn spanish_defaults() -> Vec<Self> {
        vec![
            Self::NameAndLang {
                name: "Google".into(),
                lang: "es-US".into(),
            },
            Self::NameAndLang {
                name: "Google".into(),
                lang: "es-MX".into(),
            },
            Self::NameAndLang {
                name: "Google".into(),
                lang: "es-419".into(),
            },
            Self::NameAndLangPrefix {
                name: "Google".into(),
                prefix: "es".into(),
            },
            Self::NamePattern {
                pattern: "paulina|ximena|mónica|jorge|carlos|diego".into(),
            },
            Self::Lang {
                lang: "es-US".into(),
            },
            Self::Lang {
                lang: "es-MX".into(),
            },
            Self::LangPrefix {
                prefix: "es-419".into(),
            },
            Self::LangPrefix {
                prefix: "es".into(),
            },
        ]
    }
}

/// A rule with its pattern compiled once.
#[derive(Debug)]
enum CompiledRule {
    NameAndLang { name: String, lang: String },
    NameAndLangPrefix { name: String, prefix: String },
    NamePattern(Option<Regex>),
    Lang(String),
    LangPrefix(String),
}

impl CompiledRule {
    fn compile(rule: &VoiceRule) -> Self {
        match rule {
            VoiceRule::NameAndLang { name, lang } => Self::NameAndLang {
                name: name.clone(),
                lang: lang.clone(),
            },
            VoiceRule::NameAndLangPrefix { name, prefix } => Self::NameAndLangPrefix {
                name: name.clone(),
                prefix: prefix.clone(),
            },
            VoiceRule::NamePattern { pattern } => {
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        tracing::warn!(%pattern, error = %e, "Invalid voice pattern, rule disabled");
                    })
                    .ok();
                Self::NamePattern(regex)
            }
            VoiceRule::Lang { lang } => Self::Lang(lang.clone()),
            VoiceRule::LangPrefix { prefix } => Self::LangPrefix(prefix.clone()),
        }
    }

    fn matches(&self, voice: &SystemVoice) -> bool {
        match self {
            Self::NameAndLang { name, lang } => voice.name.contains(name) && voice.lang == *lang,
            Self::NameAndLangPrefix { name, prefix } => {
                voice.name.contains(name) && voice.lang.starts_with(prefix)
            }
            Self::NamePattern(regex) => regex.as_ref().is_some_and(|re| re.is_match(&voice.name)),
            Self::Lang(lang) => voice.lang == *lang,
            Self::LangPrefix(prefix) => voice.lang.starts_with(prefix),
        }
    }
}

/// Picks the best installed voice and remembers the choice.
///
/// The cached choice is tagged with the voice-list generation it was made
/// for; a newer generation (or [`invalidate`](Self::invalidate)) forces a
/// fresh evaluation. Misses are not cached so a voice that shows up later
/// is still found.
#[derive(Debug)]
pub struct VoiceSelector {
    rules: Vec<CompiledRule>,
    cached: Mutex<Option<(u64, SystemVoice)>>,
}

impl VoiceSelector {
    #[must_use]
    pub fn new(rules: &[VoiceRule]) -> Self {
        Self {
            rules: rules.iter().map(CompiledRule::compile).collect(),
            cached: Mutex::new(None),
        }
    }

    /// Best voice out of `voices` for voice-list `generation`.
    pub fn select(&self, voices: &[SystemVoice], generation: u64) -> Option<SystemVoice> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((cached_generation, voice)) = cached.as_ref() {
            if *cached_generation == generation {
                return Some(voice.clone());
            }
        }

        let chosen = self
            .rules
            .iter()
            .find_map(|rule| voices.iter().find(|v| rule.matches(v)))
            .cloned();

        match &chosen {
            Some(voice) => {
                tracing::debug!(voice = %voice.name, lang = %voice.lang, generation, "Selected voice");
                *cached = Some((generation, voice.clone()));
            }
            None => *cached = None,
        }
        chosen
    }

    /// Forget the cached choice.
    pub fn invalidate(&self) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(name: &str, lang: &str) -> SystemVoice {
        SystemVoice {
            id: name.to_lowercase(),
            name: name.to_string(),
            lang: lang.to_string(),
        }
    }

    #[test]
    fn earlier_rules_win_regardless_of_list_order() {
        let selector = VoiceSelector::new(&VoiceRule::spanish_defaults());
        let voices = vec![
            voice("Paulina", "es-MX"),
            voice("Google español", "es-ES"),
            voice("Google español de Estados Unidos", "es-US"),
        ];
        let chosen = selector.select(&voices, 1).unwrap();
        assert_eq!(chosen.lang, "es-US");
    }

    #[test]
    fn name_pattern_is_case_insensitive() {
        let selector = VoiceSelector::new(&VoiceRule::spanish_defaults());
        let voices = vec![voice("English", "en-US"), voice("DIEGO", "es-AR")];
        assert_eq!(selector.select(&voices, 1).unwrap().name, "DIEGO");
    }

    #[test]
    fn falls_back_to_language_prefix() {
        let selector = VoiceSelector::new(&VoiceRule::spanish_defaults());
        let voices = vec![voice("English", "en-US"), voice("Castellano", "es-ES")];
        assert_eq!(selector.select(&voices, 1).unwrap().name, "Castellano");
        assert!(selector.select(&[voice("English", "en-US")], 2).is_none());
    }

    #[test]
    fn latin_american_region_beats_spain() {
        let selector = VoiceSelector::new(&VoiceRule::spanish_defaults());
        let voices = vec![voice("Castellano", "es-ES"), voice("Latino", "es-419")];
        assert_eq!(selector.select(&voices, 1).unwrap().name, "Latino");

        let google = vec![voice("Google español", "es-ES"), voice("Google", "es-419")];
        assert_eq!(selector.select(&google, 2).unwrap().lang, "es-419");
    }

    #[test]
    fn choice_is_cached_per_generation() {
        let selector = VoiceSelector::new(&VoiceRule::spanish_defaults());
        let first = vec![voice("Castellano", "es-ES")];
        assert_eq!(selector.select(&first, 1).unwrap().name, "Castellano");

        let better = vec![voice("Castellano", "es-ES"), voice("Google", "es-US")];
        assert_eq!(selector.select(&better, 1).unwrap().name, "Castellano");
        assert_eq!(selector.select(&better, 2).unwrap().name, "Google");

        selector.invalidate();
        assert_eq!(
            selector.select(&[voice("Paulina", "es-MX")], 2).unwrap().name,
            "Paulina"
        );
    }

    #[test]
    fn invalid_pattern_never_matches() {
        let selector = VoiceSelector::new(&[VoiceRule::NamePattern {
            pattern: "(unclosed".into(),
        }]);
        assert!(selector.select(&[voice("(unclosed", "es-US")], 1).is_none());
    }

    #[test]
    fn rules_deserialize_from_tagged_json() {
        let rules: Vec<VoiceRule> =
            serde_json::from_str(r#"[{ "kind": "lang_prefix", "prefix": "es" }]"#).unwrap();
        assert_eq!(
            rules,
            vec![VoiceRule::LangPrefix {
                prefix: "es".into()
            }]
        );
    }
}
