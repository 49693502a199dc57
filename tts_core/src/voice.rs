use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

/// A synthesis voice as published by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voice {
    pub id: String,
    pub name: String,
    pub gender: Gender,
    /// Display label, e.g. "English (US)"
    pub language: String,
    /// BCP-47 style code, e.g. "en-US"
    pub language_code: String,
}

impl Voice {
    pub fn new(id: &str, gender: Gender, language: &str, language_code: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            gender,
            language: language.to_string(),
            language_code: language_code.to_string(),
        }
    }
}

/// Known voices, in presentation order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VoiceCatalog {
    voices: Vec<Voice>,
}

impl VoiceCatalog {
    pub fn new(voices: Vec<Voice>) -> Self {
        Self { voices }
    }

    /// The provider's standard voice set
    pub fn builtin() -> Self {
        use Gender::*;
        Self::new(vec![
            Voice::new("Joanna", Female, "English (US)", "en-US"),
            Voice::new("Matthew", Male, "English (US)", "en-US"),
            Voice::new("Amy", Female, "English (UK)", "en-GB"),
            Voice::new("Brian", Male, "English (UK)", "en-GB"),
            Voice::new("Emma", Female, "English (UK)", "en-GB"),
            Voice::new("Olivia", Female, "English (AU)", "en-AU"),
            Voice::new("Céline", Female, "French", "fr-FR"),
            Voice::new("Mathieu", Male, "French", "fr-FR"),
            Voice::new("Marlene", Female, "German", "de-DE"),
            Voice::new("Hans", Male, "German", "de-DE"),
        ])
    }

    pub fn get(&self, id: &str) -> Option<&Voice> {
        self.voices.iter().find(|v| v.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Group voices by language label, keeping the order in which
    /// each language first appears.
    pub fn by_language(&self) -> Vec<(&str, Vec<&Voice>)> {
        let mut groups: Vec<(&str, Vec<&Voice>)> = Vec::new();
        for voice in &self.voices {
            match groups.iter_mut().find(|(lang, _)| *lang == voice.language) {
                Some((_, members)) => members.push(voice),
                None => groups.push((voice.language.as_str(), vec![voice])),
            }
        }
        groups
    }
}

impl From<Vec<Voice>> for VoiceCatalog {
    fn from(voices: Vec<Voice>) -> Self {
        Self::new(voices)
    }
}
