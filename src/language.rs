//! Language selection for localized GeoLite2 names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Languages the announcement can be localized to.
///
/// These are the GeoLite2 `names` keys the plugin knows about. Anything else
/// resolves to [`Language::En`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Language {
    Ru,
    De,
    Es,
    Ja,
    Fr,
    #[default]
    En,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::Ru,
        Language::De,
        Language::Es,
        Language::Ja,
        Language::Fr,
        Language::En,
    ];

    /// The key used in the MMDB `names` map.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Language::Ru => "ru",
            Language::De => "de",
            Language::Es => "es",
            Language::Ja => "ja",
            Language::Fr => "fr",
            Language::En => "en",
        }
    }

    /// Lenient lookup: unsupported codes fall back to English.
    #[must_use]
    pub fn from_code(code: &str) -> Language {
        code.parse().unwrap_or(Language::En)
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Language::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| Error::UnknownLanguage {
                code: code.to_string(),
            })
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for Language {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Language::from_code(&code))
    }
}

/// What to do when a record has no name in the configured language.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingNamePolicy {
    /// Leave the name empty. A missing country then means no location at all.
    #[default]
    Empty,
    /// Retry with the English name.
    English,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_from_str() {
        for lang in Language::ALL {
            assert_eq!(lang.code().parse::<Language>().unwrap(), lang);
        }
    }

    #[test]
    fn from_str_is_case_insensitive() {
        assert_eq!("RU".parse::<Language>().unwrap(), Language::Ru);
        assert_eq!(" de ".parse::<Language>().unwrap(), Language::De);
    }

    #[test]
    fn from_str_rejects_unknown() {
        assert!(matches!(
            "pt-BR".parse::<Language>(),
            Err(Error::UnknownLanguage { .. })
        ));
    }

    #[test]
    fn from_code_falls_back_to_english() {
        assert_eq!(Language::from_code("zh-CN"), Language::En);
        assert_eq!(Language::from_code(""), Language::En);
        assert_eq!(Language::from_code("ja"), Language::Ja);
    }

    #[test]
    fn deserialize_is_lenient() {
        let lang: Language = serde_json::from_str("\"klingon\"").unwrap();
        assert_eq!(lang, Language::En);
        let lang: Language = serde_json::from_str("\"fr\"").unwrap();
        assert_eq!(lang, Language::Fr);
    }

    #[test]
    fn policy_uses_lowercase_names() {
        let policy: MissingNamePolicy = serde_json::from_str("\"english\"").unwrap();
        assert_eq!(policy, MissingNamePolicy::English);
        assert_eq!(
            serde_json::to_string(&MissingNamePolicy::Empty).unwrap(),
            "\"empty\""
        );
    }
}
