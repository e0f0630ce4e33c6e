//! Language-keyed message tables.
//!
//! Later deployments ship the announcement texts as a translation table
//! (`lang/<locale>.json`) instead of inline config. A table may override any
//! template and the log prefix; whatever it leaves out comes from the config.

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::template::{Placeholder, Template};

/// Locale used when the requested one has no entry for a key.
pub const FALLBACK_LOCALE: &str = "en";

/// Keys recognized in a translation table.
pub mod keys {
    pub const LOG_PREFIX: &str = "LogPrefix";
    pub const CONNECT_WITH_GEO: &str = "ConnectMessageWithGeo";
    pub const CONNECT_WITHOUT_GEO: &str = "ConnectMessageWithoutGeo";
    pub const DISCONNECT: &str = "DisconnectMessage";
    pub const CONSOLE_CONNECT_WITH_GEO: &str = "ConsoleConnectMessageWithGeo";
    pub const CONSOLE_CONNECT_WITHOUT_GEO: &str = "ConsoleConnectMessageWithoutGeo";
    pub const CONSOLE_DISCONNECT: &str = "ConsoleDisconnectMessage";
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Translations {
    tables: BTreeMap<String, BTreeMap<String, String>>,
}

impl Translations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `{ "<locale>": { "<key>": "<text>" } }`.
    pub fn from_json_reader<R: Read>(path: &Path, rdr: R) -> Result<Self> {
        let tables = serde_json::from_reader(rdr).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { tables })
    }

    /// Load every `<locale>.json` file in `dir`.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let mut translations = Self::new();
        for entry in fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(locale) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = fs::read_to_string(&path)?;
            let table = serde_json::from_str(&content).map_err(|source| Error::Config {
                path: path.clone(),
                source,
            })?;
            tracing::debug!(locale, path = %path.display(), "loaded translations");
            translations.tables.insert(locale.to_string(), table);
        }
        Ok(translations)
    }

    pub fn insert(&mut self, locale: &str, key: &str, text: &str) -> &mut Self {
        self.tables
            .entry(locale.to_string())
            .or_default()
            .insert(key.to_string(), text.to_string());
        self
    }

    #[must_use]
    pub fn locales(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Look `key` up in `locale`, then in [`FALLBACK_LOCALE`].
    #[must_use]
    pub fn get(&self, locale: &str, key: &str) -> Option<&str> {
        let find = |locale: &str| {
            self.tables
                .get(locale)
                .and_then(|table| table.get(key))
                .map(String::as_str)
        };
        find(locale).or_else(|| find(FALLBACK_LOCALE))
    }
}

/// The compiled set of texts used for one announcement locale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Messages {
    pub log_prefix: String,
    pub connect_with_geo: Template,
    pub connect_without_geo: Template,
    pub disconnect: Template,
    pub console_connect_with_geo: Template,
    pub console_connect_without_geo: Template,
    pub console_disconnect: Template,
}

impl Messages {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::build(config, |_| None)
    }

    /// Texts for `locale`, falling back to English entries and then to config.
    #[must_use]
    pub fn localized(config: &Config, translations: &Translations, locale: &str) -> Self {
        Self::build(config, |key| translations.get(locale, key))
    }

    fn build<'a>(config: &'a Config, lookup: impl Fn(&str) -> Option<&'a str>) -> Self {
        let text = |key: &str, default: &'a str| lookup(key).unwrap_or(default);
        let messages = Messages {
            log_prefix: text(keys::LOG_PREFIX, &config.log_prefix).to_string(),
            connect_with_geo: text(keys::CONNECT_WITH_GEO, &config.connect_message_with_geo).into(),
            connect_without_geo: text(
                keys::CONNECT_WITHOUT_GEO,
                &config.connect_message_without_geo,
            )
            .into(),
            disconnect: text(keys::DISCONNECT, &config.disconnect_message).into(),
            console_connect_with_geo: text(
                keys::CONSOLE_CONNECT_WITH_GEO,
                &config.console_connect_message_with_geo,
            )
            .into(),
            console_connect_without_geo: text(
                keys::CONSOLE_CONNECT_WITHOUT_GEO,
                &config.console_connect_message_without_geo,
            )
            .into(),
            console_disconnect: text(keys::CONSOLE_DISCONNECT, &config.console_disconnect_message)
                .into(),
        };
        for (key, template) in [
            (keys::CONNECT_WITH_GEO, &messages.connect_with_geo),
            (keys::CONSOLE_CONNECT_WITH_GEO, &messages.console_connect_with_geo),
        ] {
            if !template.uses(Placeholder::GeoInfo) {
                tracing::warn!(key, "template never shows the location");
            }
        }
        messages
    }
}
