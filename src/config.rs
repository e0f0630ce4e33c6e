//! Plugin configuration.
//!
//! Stored as JSON with PascalCase keys. Missing keys take their defaults and
//! unknown keys are ignored, so configs written by older releases keep
//! working.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::color::ColorTableKind;
use crate::error::{Error, Result};
use crate::language::{Language, MissingNamePolicy};
use crate::mmdb;

/// File name of the plugin config inside its config directory.
pub const CONFIG_FILENAME: &str = "ConnectInfo.json";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Config {
    /// Language of country and city names.
    pub geo_lite_language: Language,
    /// Append the city to the country when both are known.
    pub city_included: bool,
    /// Prefix for every console log line.
    pub log_prefix: String,
    pub connect_message_with_geo: String,
    pub connect_message_without_geo: String,
    pub disconnect_message: String,
    pub console_connect_message_with_geo: String,
    pub console_connect_message_without_geo: String,
    pub console_disconnect_message: String,
    /// Players holding any of these permissions are never announced.
    pub immunity_flags: BTreeSet<String>,
    pub missing_name_policy: MissingNamePolicy,
    /// Color table for chat messages.
    pub color_table: ColorTableKind,
    /// Overrides the default database location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geo_lite_language: Language::Ru,
            city_included: true,
            log_prefix: "[Connect Info] ".to_string(),
            connect_message_with_geo: "{PURPLE}[INFO] {DEFAULT}Игрок {GREY}{PLAYERNAME} {DEFAULT} подключается из {GREEN}{GEOINFO} {LIME}[+]".to_string(),
            connect_message_without_geo: "{PURPLE}[INFO] {DEFAULT}Игрок {GREY}{PLAYERNAME} {DEFAULT} подключается {LIME}[+]".to_string(),
            disconnect_message: "{PURPLE}[INFO] {DEFAULT}Игрок {GREY}{PLAYERNAME} {DEFAULT} вышел с сервера {LIGHTRED}[-]".to_string(),
            console_connect_message_with_geo: "Игрок {PLAYERNAME} подключается из {GEOINFO}".to_string(),
            console_connect_message_without_geo: "Игрок {PLAYERNAME} подключается".to_string(),
            console_disconnect_message: "Игрок {PLAYERNAME} вышел с сервера".to_string(),
            immunity_flags: BTreeSet::new(),
            missing_name_policy: MissingNamePolicy::Empty,
            color_table: ColorTableKind::Chat,
            database_path: None,
        }
    }
}

impl Config {
    /// Parse a config from JSON text.
    pub fn from_json(path: &Path, json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load config from `path`, creating a default file if it is missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file exists but is not valid JSON, or
    /// [`Error::Io`] if it cannot be read or the default cannot be written.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config = Self::from_json(path, &content)?;
            tracing::debug!(path = %path.display(), "loaded config");
            Ok(config)
        } else {
            let config = Self::default();
            config.save(path)?;
            tracing::info!(path = %path.display(), "created default config");
            Ok(config)
        }
    }

    /// Database file for a plugin installed in `plugin_dir`.
    ///
    /// A relative `DatabasePath` is taken from `plugin_dir`; without one the
    /// shared `../../shared/GeoLite2-City.mmdb` is used.
    #[must_use]
    pub fn database_file(&self, plugin_dir: &Path) -> PathBuf {
        match &self.database_path {
            Some(path) => plugin_dir.join(path),
            None => mmdb::default_database_path(plugin_dir),
        }
    }

    /// Write config to `path`, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, content)?;
        tracing::debug!(path = %path.display(), "saved config");
        Ok(())
    }
}
