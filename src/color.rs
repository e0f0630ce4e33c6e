//! Color mnemonic tables.
//!
//! A table maps `{MNEMONIC}` tokens to the control codes a given output
//! understands. Tables are applied in order with replace-all semantics and
//! leave unknown tokens in place.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Chat colors of the current CS2 client.
const CHAT: &[(&str, &str)] = &[
    ("{DEFAULT}", "\x01"),
    ("{WHITE}", "\x01"),
    ("{DARKRED}", "\x02"),
    ("{GREEN}", "\x04"),
    ("{LIGHTYELLOW}", "\x09"),
    ("{LIGHTBLUE}", "\x0B"),
    ("{OLIVE}", "\x05"),
    ("{LIME}", "\x06"),
    ("{RED}", "\x07"),
    ("{LIGHTPURPLE}", "\x03"),
    ("{PURPLE}", "\x0E"),
    ("{GREY}", "\x08"),
    ("{YELLOW}", "\x09"),
    ("{GOLD}", "\x10"),
    ("{SILVER}", "\x0A"),
    ("{BLUE}", "\x0B"),
    ("{DARKBLUE}", "\x0C"),
    ("{BLUEGREY}", "\x0A"),
    ("{MAGENTA}", "\x0E"),
    ("{LIGHTRED}", "\x0F"),
    ("{ORANGE}", "\x10"),
];

/// Byte codes used by early releases.
const LEGACY: &[(&str, &str)] = &[
    ("{DEFAULT}", "\x01"),
    ("{RED}", "\x02"),
    ("{LIGHTPURPLE}", "\x03"),
    ("{GREEN}", "\x04"),
    ("{LIME}", "\x05"),
    ("{LIGHTGREEN}", "\x06"),
    ("{LIGHTRED}", "\x07"),
    ("{GRAY}", "\x08"),
    ("{LIGHTOLIVE}", "\x09"),
    ("{OLIVE}", "\x10"),
    ("{LIGHTBLUE}", "\x0B"),
    ("{BLUE}", "\x0C"),
    ("{PURPLE}", "\x0E"),
    ("{GRAYBLUE}", "\x0A"),
];

/// An ordered mnemonic to control-code table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorTable {
    entries: Cow<'static, [(&'static str, &'static str)]>,
}

impl Default for ColorTable {
    fn default() -> Self {
        Self::chat()
    }
}

impl ColorTable {
    /// The 21-entry chat table.
    #[must_use]
    pub fn chat() -> Self {
        Self {
            entries: Cow::Borrowed(CHAT),
        }
    }

    /// The 14-entry legacy byte-code table.
    #[must_use]
    pub fn legacy() -> Self {
        Self {
            entries: Cow::Borrowed(LEGACY),
        }
    }

    /// Every mnemonic known to [`chat`](Self::chat) or
    /// [`legacy`](Self::legacy), mapped to nothing. For plain-text outputs
    /// such as the server console.
    #[must_use]
    pub fn plain() -> Self {
        let mut entries: Vec<(&'static str, &'static str)> = Vec::with_capacity(CHAT.len());
        for (token, _) in CHAT.iter().chain(LEGACY) {
            if !entries.iter().any(|(t, _)| t == token) {
                entries.push((*token, ""));
            }
        }
        Self {
            entries: Cow::Owned(entries),
        }
    }

    /// A deployment-specific table.
    #[must_use]
    pub fn custom(entries: Vec<(&'static str, &'static str)>) -> Self {
        Self {
            entries: Cow::Owned(entries),
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[(&'static str, &'static str)] {
        &self.entries
    }

    /// Replace every known mnemonic in `text`.
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for &(token, code) in self.entries.iter() {
            // Most messages use only a handful of colors.
            if out.contains(token) {
                out = out.replace(token, code);
            }
        }
        out
    }
}

/// Built-in table selector for configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTableKind {
    #[default]
    Chat,
    Legacy,
    Plain,
}

impl ColorTableKind {
    #[must_use]
    pub fn table(self) -> ColorTable {
        match self {
            ColorTableKind::Chat => ColorTable::chat(),
            ColorTableKind::Legacy => ColorTable::legacy(),
            ColorTableKind::Plain => ColorTable::plain(),
        }
    }
}

impl FromStr for ColorTableKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" => Ok(ColorTableKind::Chat),
            "legacy" => Ok(ColorTableKind::Legacy),
            "plain" => Ok(ColorTableKind::Plain),
            _ => Err(Error::UnknownColorTable { name: s.to_string() }),
        }
    }
}

impl fmt::Display for ColorTableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColorTableKind::Chat => "chat",
            ColorTableKind::Legacy => "legacy",
            ColorTableKind::Plain => "plain",
        })
    }
}
