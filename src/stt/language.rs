//! Supported transcription languages.

use crate::error::{BatchscribeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language of the submitted audio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Language {
    #[default]
    En,
    Pl,
    Es,
    Fr,
    De,
    It,
    Pt,
    Nl,
    Ru,
    Zh,
    Ja,
    Ko,
}

impl Language {
    /// All supported languages, in display order.
    pub const ALL: [Language; 12] = [
        Language::En,
        Language::Pl,
        Language::Es,
        Language::Fr,
        Language::De,
        Language::It,
        Language::Pt,
        Language::Nl,
        Language::Ru,
        Language::Zh,
        Language::Ja,
        Language::Ko,
    ];

    /// ISO 639-1 code sent to the service.
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Pl => "pl",
            Language::Es => "es",
            Language::Fr => "fr",
            Language::De => "de",
            Language::It => "it",
            Language::Pt => "pt",
            Language::Nl => "nl",
            Language::Ru => "ru",
            Language::Zh => "zh",
            Language::Ja => "ja",
            Language::Ko => "ko",
        }
    }

    /// English display name.
    pub fn name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Pl => "Polish",
            Language::Es => "Spanish",
            Language::Fr => "French",
            Language::De => "German",
            Language::It => "Italian",
            Language::Pt => "Portuguese",
            Language::Nl => "Dutch",
            Language::Ru => "Russian",
            Language::Zh => "Chinese",
            Language::Ja => "Japanese",
            Language::Ko => "Korean",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<String> for Language {
    type Error = BatchscribeError;

    fn try_from(code: String) -> Result<Self> {
        code.parse()
    }
}

impl FromStr for Language {
    type Err = BatchscribeError;

    /// Accepts the code in any case, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|lang| lang.code() == code)
            .ok_or_else(|| BatchscribeError::UnsupportedLanguage {
                code: s.trim().to_string(),
            })
    }
}
