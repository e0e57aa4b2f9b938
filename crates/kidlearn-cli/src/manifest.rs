//! The table of clips to render: clip key → text to speak.
//!
//! The built-in table covers every clip the games ask for. Keys are the
//! same [`ClipKey`]s the engine looks up, so a rendered `<key>.mp3` is found
//! by the clip cache without any mapping.

use std::collections::BTreeMap;
use std::path::Path;

use kidlearn_audio::ClipKey;
use kidlearn_audio::keys::{self, CELEBRATIONS, STREAK_TEXT, TRY_AGAIN_TEXT};

use crate::error::GenerateError;

/// Letters taught in the letters game.
const LETTERS: &str = "ABCDEFGHIJLMNOPRSTUV";

/// The picture word taught with each letter, as `(key, spoken)`.
const LETTER_WORDS: &[(&str, &str)] = &[
    ("AVIÓN", "avión"),
    ("BUS", "bus"),
    ("CASA", "casa"),
    ("DELFÍN", "delfín"),
    ("ESTRELLA", "estrella"),
    ("FLOR", "flor"),
    ("GATO", "gato"),
    ("HELADO", "helado"),
    ("IRIS", "iris"),
    ("JIRAFA", "jirafa"),
    ("LUNA", "luna"),
    ("MANZANA", "manzana"),
    ("NUBE", "nube"),
    ("OSO", "oso"),
    ("PÁJARO", "pájaro"),
    ("RANA", "rana"),
    ("SOL", "sol"),
    ("TORTUGA", "tortuga"),
    ("UVA", "uva"),
    ("VACA", "vaca"),
];

/// Remaining words of the words game.
const GAME_WORDS: &[(&str, &str)] = &[
    ("ARAÑA", "araña"),
    ("ÁRBOL", "árbol"),
    ("APPLE", "apple"),
    ("BALÓN", "balón"),
    ("BALLENA", "ballena"),
    ("BANANA", "banana"),
    ("CONEJO", "conejo"),
    ("CARRO", "carro"),
    ("CHOCOLATE", "chocolate"),
    ("DIENTE", "diente"),
    ("DADO", "dado"),
    ("DINOSAURIO", "dinosaurio"),
    ("ELEFANTE", "elefante"),
    ("ESCALERA", "escalera"),
    ("ESCUELA", "escuela"),
    ("FRESA", "fresa"),
    ("FLAMINGO", "flamenco"),
    ("FOCA", "foca"),
    ("GIRASOL", "girasol"),
    ("GORILA", "gorila"),
    ("GALLETA", "galleta"),
    ("HOJA", "hoja"),
    ("HADA", "hada"),
    ("HIPOPÓTAMO", "hipopótamo"),
    ("ISLA", "isla"),
    ("IGUANA", "iguana"),
    ("IGLÚ", "iglú"),
    ("JAZMÍN", "jazmín"),
    ("JUEGO", "juego"),
    ("JUGUETE", "juguete"),
    ("LEÓN", "león"),
    ("LAGARTO", "lagarto"),
    ("LÁMPARA", "lámpara"),
    ("MARIPOSA", "mariposa"),
    ("MAR", "mar"),
    ("MONO", "mono"),
    ("NAVIDAD", "navidad"),
    ("NARIZ", "nariz"),
    ("NARANJA", "naranja"),
    ("OJO", "ojo"),
    ("OVEJA", "oveja"),
    ("OLA", "ola"),
    ("PEZ", "pez"),
    ("PANDA", "panda"),
    ("PAPOSA", "paposa"),
    ("ROSA", "rosa"),
    ("RATÓN", "ratón"),
    ("RAPOSA", "raposa"),
    ("SERPIENTE", "serpiente"),
    ("SETA", "seta"),
    ("SABANA", "sabana"),
    ("TIGRE", "tigre"),
    ("TELESCOPIO", "telescopio"),
    ("TARÁNTULA", "tarántula"),
    ("UNICORNIO", "unicornio"),
    ("URSO", "urso"),
    ("UMBRELA", "umbrela"),
    ("VIENTO", "viento"),
    ("LUZ", "luz"),
    ("PIE", "pie"),
    ("AVE", "ave"),
    ("RÍO", "río"),
    ("MES", "mes"),
    ("GEL", "gel"),
];

const NAVIGATION: &[(&str, &str)] = &[
    (ClipKey::NAV_LETTERS, "Vamos a aprender letras"),
    (ClipKey::NAV_NUMBERS, "Vamos a aprender números"),
    (ClipKey::NAV_WORDS, "Vamos a aprender palabras"),
    (ClipKey::NAV_MENU, "Menú principal"),
];

/// Highest number with `num-` and `count-` clips.
const MAX_NUMBER: u32 = 10;

/// Ordered clip key → text table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeMap<String, String>,
}

impl Manifest {
    /// Every clip the games use.
    #[must_use]
    pub fn builtin() -> Self {
        let mut manifest = Self::default();

        for letter in LETTERS.chars().map(String::from) {
            manifest.insert(&ClipKey::letter(&letter), keys::letter_name(&letter));
        }
        for (word, spoken) in LETTER_WORDS {
            manifest.insert(&ClipKey::de_word(word), format!("de {spoken}"));
            manifest.insert(&ClipKey::word(word), *spoken);
        }
        for (word, spoken) in GAME_WORDS {
            manifest.insert(&ClipKey::word(word), *spoken);
        }
        for n in 1..=MAX_NUMBER {
            manifest.insert(&ClipKey::number(n), keys::number_label(n));
            manifest.insert(&ClipKey::count(n), n.to_string());
        }
        for (i, text) in CELEBRATIONS.iter().enumerate() {
            manifest.insert(&ClipKey::celebrate(i + 1), *text);
        }
        manifest.insert(&ClipKey::phrase(ClipKey::CELEBRATE_STREAK), STREAK_TEXT);
        manifest.insert(&ClipKey::phrase(ClipKey::TRY_AGAIN), TRY_AGAIN_TEXT);
        manifest.insert(&ClipKey::phrase(ClipKey::CORRECT), "¡Correcto!");
        for (key, text) in NAVIGATION {
            manifest.insert(&ClipKey::phrase(key), *text);
        }

        manifest
    }

    /// The built-in table, extended or overridden by a JSON file.
    pub fn load(overrides: Option<&Path>) -> Result<Self, GenerateError> {
        let mut manifest = Self::builtin();
        if let Some(path) = overrides {
            let text = std::fs::read_to_string(path)?;
            let extra = Self::from_json(&text)?;
            tracing::info!(path = %path.display(), entries = extra.len(), "Merged manifest overrides");
            manifest.merge(extra);
        }
        Ok(manifest)
    }

    /// Parse a JSON object of `"key": "text"` pairs.
    pub fn from_json(text: &str) -> Result<Self, GenerateError> {
        let entries: BTreeMap<String, String> = serde_json::from_str(text)?;
        Ok(Self { entries })
    }

    /// Add `other`'s entries, replacing texts of keys present in both.
    pub fn merge(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    pub fn insert(&mut self, key: &ClipKey, text: impl Into<String>) {
        self.entries.insert(key.as_str().to_string(), text.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Total characters to render, which is what the API bills.
    #[must_use]
    pub fn char_count(&self) -> usize {
        self.entries.values().map(|text| text.chars().count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_every_group() {
        let manifest = Manifest::builtin();

        assert_eq!(manifest.get("letter-A"), Some("a"));
        assert_eq!(manifest.get("letter-R"), Some("erre"));
        assert_eq!(manifest.get("de-SOL"), Some("de sol"));
        assert_eq!(manifest.get("word-FLAMINGO"), Some("flamenco"));
        assert_eq!(manifest.get("num-10"), Some("diez"));
        assert_eq!(manifest.get("count-3"), Some("3"));
        assert_eq!(manifest.get("celebrate-3"), Some("¡Bravo!"));
        assert_eq!(manifest.get("try-again"), Some("¡Inténtalo de nuevo!"));
        assert_eq!(manifest.get("nav-menu"), Some("Menú principal"));
        // letters + de + words + num + count + celebrate + streak/try/correct + nav
        assert_eq!(manifest.len(), 20 + 20 + 84 + 10 + 10 + 7 + 3 + 4);
    }

    #[test]
    fn every_critical_key_is_rendered() {
        let manifest = Manifest::builtin();
        for key in kidlearn_audio::keys::critical_keys() {
            assert!(manifest.get(key.as_str()).is_some(), "missing {key}");
        }
    }

    #[test]
    fn overrides_replace_and_extend() {
        let mut manifest = Manifest::builtin();
        let extra =
            Manifest::from_json(r#"{"letter-A": "aaa", "nav-settings": "Ajustes"}"#).unwrap();
        let before = manifest.len();

        manifest.merge(extra);

        assert_eq!(manifest.get("letter-A"), Some("aaa"));
        assert_eq!(manifest.get("nav-settings"), Some("Ajustes"));
        assert_eq!(manifest.len(), before + 1);
    }

    #[test]
    fn rejects_non_string_values() {
        let err = Manifest::from_json(r#"{"letter-A": 1}"#).unwrap_err();
        assert!(matches!(err, GenerateError::Manifest(_)));
    }

    #[test]
    fn loads_overrides_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extra.json");
        std::fs::write(&path, r#"{"word-KIWI": "kiwi"}"#).unwrap();

        let manifest = Manifest::load(Some(&path)).unwrap();

        assert_eq!(manifest.get("word-KIWI"), Some("kiwi"));
        assert_eq!(manifest.len(), Manifest::builtin().len() + 1);
    }
}
