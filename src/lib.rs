//! Player connect and disconnect announcements with offline GeoIP location.
//!
//! The library resolves a connecting player's address to `"Country"` or
//! `"Country, City"` using a GeoLite2-City database, fills the configured
//! message templates and maps color mnemonics to the chat control codes of
//! the game client.
//!
//! # Examples
//!
//! Resolving and formatting with an in-memory database:
//!
//! ```rust
//! use std::sync::Arc;
//! use connectinfo::{
//!     ColorTable, GeoRecord, GeoResolver, Language, MessageFormatter, StaticDatabase,
//! };
//!
//! let db = StaticDatabase::new().with(
//!     "5.9.0.1".parse().unwrap(),
//!     GeoRecord::new(
//!         [("en", "Germany")].into_iter().collect(),
//!         [("en", "Berlin")].into_iter().collect(),
//!     ),
//! );
//! let resolver = GeoResolver::new(Arc::new(db));
//! let geo = resolver.resolve("5.9.0.1", Language::En, true).unwrap_or_default();
//! assert_eq!(geo, "Germany, Berlin");
//!
//! let formatter = MessageFormatter::new(ColorTable::chat());
//! let chat = formatter.format("{GREEN}{PLAYERNAME}{DEFAULT} from {GEOINFO}", "Alice", &geo);
//! assert_eq!(chat, "\x04Alice\x01 from Germany, Berlin");
//! ```

pub mod color;
pub mod config;
pub mod error;
pub mod event;
pub mod formatter;
pub mod geoip;
pub mod language;
pub mod locale;
pub mod mmdb;
pub mod template;

pub use crate::color::{ColorTable, ColorTableKind};
pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::event::{Announcement, ConnectInfo, Host, Immunity, Player};
pub use crate::formatter::MessageFormatter;
pub use crate::geoip::GeoResolver;
pub use crate::language::{Language, MissingNamePolicy};
pub use crate::locale::{Messages, Translations};
pub use crate::mmdb::{GeoRecord, LocalizedNames, LookupDatabase, MaxMindDatabase, StaticDatabase};
pub use crate::template::{Placeholder, Template};
