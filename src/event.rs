//! Connect and disconnect announcements.
//!
//! The host (game server) owns player sessions and output. It hands a
//! [`Player`] snapshot to [`ConnectInfo`] and receives the finished lines
//! through the [`Host`] trait.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::color::ColorTable;
use crate::config::Config;
use crate::formatter::MessageFormatter;
use crate::geoip::GeoResolver;
use crate::locale::Messages;
use crate::mmdb::{LookupDatabase, MaxMindDatabase};

/// Permission prefix character for flags.
pub const PERMISSION_PREFIX: char = '@';

/// Permissions held by a player, e.g. `@css/ban`.
///
/// `@domain/root` and `@domain/*` grant every flag of that domain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PermissionSet {
    flags: HashSet<String>,
}

impl PermissionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, flag: &str) -> &mut Self {
        self.flags.insert(flag.to_string());
        self
    }

    #[must_use]
    pub fn has(&self, flag: &str) -> bool {
        if self.flags.contains(flag) {
            return true;
        }
        match extract_domain(flag) {
            Some(domain) => {
                self.flags.contains(&format!("@{domain}/root"))
                    || self.flags.contains(&format!("@{domain}/*"))
            }
            None => false,
        }
    }

    #[must_use]
    pub fn has_any<'a>(&self, flags: impl IntoIterator<Item = &'a str>) -> bool {
        flags.into_iter().any(|f| self.has(f))
    }
}

impl<'a> FromIterator<&'a str> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self {
            flags: iter.into_iter().map(str::to_string).collect(),
        }
    }
}

/// `@domain/flag` -> `Some("domain")`
fn extract_domain(flag: &str) -> Option<&str> {
    flag.strip_prefix(PERMISSION_PREFIX)
        .and_then(|rest| rest.split_once('/'))
        .map(|(domain, _)| domain)
}

/// What the host knows about a player at connect or disconnect time.
#[derive(Clone, Debug, Default)]
pub struct Player {
    pub slot: u32,
    pub name: String,
    /// Remote address as reported by the engine, usually `ip:port`.
    pub address: String,
    /// SteamID64.
    pub steam_id: u64,
    pub is_valid: bool,
    pub is_bot: bool,
    pub is_hltv: bool,
    pub permissions: PermissionSet,
}

impl Player {
    /// A valid human player with no permissions.
    #[must_use]
    pub fn human(name: &str, address: &str, steam_id: u64) -> Self {
        Player {
            name: name.to_string(),
            address: address.to_string(),
            steam_id,
            is_valid: true,
            ..Default::default()
        }
    }

    /// Real Steam accounts have a 17-digit SteamID64.
    #[must_use]
    pub fn has_steam_account(&self) -> bool {
        self.steam_id.to_string().len() == 17
    }
}

/// Decides whether a player is hidden from announcements.
pub trait Immunity: Send + Sync {
    fn is_immune(&self, player: &Player) -> bool;
}

/// Immune when the player holds any of the configured flags.
#[derive(Clone, Debug, Default)]
pub struct FlagImmunity {
    flags: Vec<String>,
}

impl FlagImmunity {
    pub fn new<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            flags: flags.into_iter().map(Into::into).collect(),
        }
    }
}

impl Immunity for FlagImmunity {
    fn is_immune(&self, player: &Player) -> bool {
        player
            .permissions
            .has_any(self.flags.iter().map(String::as_str))
    }
}

/// Nobody is immune.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoImmunity;

impl Immunity for NoImmunity {
    fn is_immune(&self, _player: &Player) -> bool {
        false
    }
}

/// Bots, SourceTV, sessions without a Steam account and immune players are
/// never announced.
pub fn is_announceable(player: &Player, immunity: &dyn Immunity) -> bool {
    player.is_valid
        && !player.is_bot
        && !player.is_hltv
        && player.has_steam_account()
        && !immunity.is_immune(player)
}

/// Output side of the host.
pub trait Host {
    /// Write a line to the server console.
    fn log_console(&mut self, line: &str);

    /// Broadcast to every client's chat on the next server frame.
    fn print_to_chat_all_next_frame(&mut self, message: String);
}

/// The two lines produced for one event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Announcement {
    /// Console line, including the log prefix.
    pub console: String,
    /// Chat line with color control codes.
    pub chat: String,
}

/// The connect-info plugin.
pub struct ConnectInfo {
    config: Config,
    messages: Messages,
    resolver: GeoResolver,
    chat: MessageFormatter,
    console: MessageFormatter,
    immunity: Box<dyn Immunity>,
}

impl ConnectInfo {
    pub fn new(config: Config, resolver: GeoResolver) -> Self {
        let messages = Messages::from_config(&config);
        let immunity = Box::new(FlagImmunity::new(config.immunity_flags.iter().cloned()));
        let resolver = resolver.with_policy(config.missing_name_policy);
        Self {
            chat: MessageFormatter::new(config.color_table.table()),
            console: MessageFormatter::new(ColorTable::plain()),
            config,
            messages,
            resolver,
            immunity,
        }
    }

    /// Plugin load: open the database once from the location the config
    /// names for `plugin_dir`. A missing or broken database is logged and
    /// announcements continue without location.
    pub fn load(config: Config, plugin_dir: &Path) -> Self {
        let resolver = match MaxMindDatabase::open(config.database_file(plugin_dir)) {
            Ok(db) => {
                tracing::info!(
                    path = %db.path().display(),
                    database_type = db.database_type(),
                    build_epoch = db.build_epoch(),
                    "geolocation database loaded"
                );
                GeoResolver::new(Arc::new(db) as Arc<dyn LookupDatabase>)
            }
            Err(err) => {
                tracing::error!(error = %err, "geolocation disabled");
                GeoResolver::unavailable()
            }
        };
        let plugin = Self::new(config, resolver);
        tracing::info!("{}Connect Info loaded", plugin.messages.log_prefix);
        plugin
    }

    #[must_use]
    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    #[must_use]
    pub fn with_immunity(mut self, immunity: Box<dyn Immunity>) -> Self {
        self.immunity = immunity;
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn resolver(&self) -> &GeoResolver {
        &self.resolver
    }

    #[must_use]
    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    fn console_line(&self, body: String) -> String {
        format!("{}{}", self.messages.log_prefix, body)
    }

    /// Build the connect announcement, or `None` if the player is skipped.
    pub fn on_connect(&self, player: &Player) -> Option<Announcement> {
        if !is_announceable(player, self.immunity.as_ref()) {
            tracing::trace!(slot = player.slot, "connect not announced");
            return None;
        }

        let geo = self.resolver.resolve_address(
            &player.address,
            self.config.geo_lite_language,
            self.config.city_included,
        );
        let m = &self.messages;
        let (console, chat, geo) = match geo.as_deref() {
            Some(geo) => (&m.console_connect_with_geo, &m.connect_with_geo, geo),
            None => (&m.console_connect_without_geo, &m.connect_without_geo, ""),
        };

        Some(Announcement {
            console: self.console_line(self.console.render(console, &player.name, geo)),
            chat: self.chat.render(chat, &player.name, geo),
        })
    }

    /// Build the disconnect announcement, or `None` if the player is skipped.
    pub fn on_disconnect(&self, player: &Player) -> Option<Announcement> {
        if !is_announceable(player, self.immunity.as_ref()) {
            tracing::trace!(slot = player.slot, "disconnect not announced");
            return None;
        }
        let m = &self.messages;
        let console = self.console.render(&m.console_disconnect, &player.name, "");
        Some(Announcement {
            console: self.console_line(console),
            chat: self.chat.render(&m.disconnect, &player.name, ""),
        })
    }

    pub fn handle_connect(&self, player: &Player, host: &mut dyn Host) {
        if let Some(announcement) = self.on_connect(player) {
            emit(host, announcement);
        }
    }

    pub fn handle_disconnect(&self, player: &Player, host: &mut dyn Host) {
        if let Some(announcement) = self.on_disconnect(player) {
            emit(host, announcement);
        }
    }
}

fn emit(host: &mut dyn Host, announcement: Announcement) {
    host.log_console(&announcement.console);
    host.print_to_chat_all_next_frame(announcement.chat);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::mmdb::{GeoRecord, StaticDatabase};

    const STEAM_ID: u64 = 76561198012345678;

    #[derive(Default)]
    struct RecordingHost {
        console: Vec<String>,
        chat: Vec<String>,
    }

    impl Host for RecordingHost {
        fn log_console(&mut self, line: &str) {
            self.console.push(line.to_string());
        }

        fn print_to_chat_all_next_frame(&mut self, message: String) {
            self.chat.push(message);
        }
    }

    fn english_config() -> Config {
        Config {
            geo_lite_language: Language::En,
            log_prefix: "[CI] ".to_string(),
            connect_message_with_geo: "{GREEN}{PLAYERNAME} from {GEOINFO}".to_string(),
            connect_message_without_geo: "{GREEN}{PLAYERNAME} joined".to_string(),
            disconnect_message: "{LIGHTRED}{PLAYERNAME} left".to_string(),
            console_connect_message_with_geo: "{PLAYERNAME} connects from {GEOINFO}".to_string(),
            console_connect_message_without_geo: "{PLAYERNAME} connects".to_string(),
            console_disconnect_message: "{RED}{PLAYERNAME} disconnected".to_string(),
            ..Config::default()
        }
    }

    fn plugin(config: Config) -> ConnectInfo {
        let db = StaticDatabase::new().with(
            "5.9.0.1".parse().unwrap(),
            GeoRecord::new(
                [("en", "Germany")].into_iter().collect(),
                [("en", "Berlin")].into_iter().collect(),
            ),
        );
        ConnectInfo::new(config, GeoResolver::new(Arc::new(db)))
    }

    #[test]
    fn permission_root_and_wildcard() {
        let set: PermissionSet = ["@css/root", "@vip/*"].into_iter().collect();
        assert!(set.has("@css/ban"));
        assert!(set.has("@vip/hidden"));
        assert!(!set.has("@other/x"));
        assert!(!set.has("plain"));
    }

    #[test]
    fn extract_domain_forms() {
        assert_eq!(extract_domain("@css/ban"), Some("css"));
        assert_eq!(extract_domain("@css"), None);
        assert_eq!(extract_domain("css/ban"), None);
    }

    #[test]
    fn connect_with_geo() {
        let plugin = plugin(english_config());
        let player = Player::human("Alice", "5.9.0.1:27005", STEAM_ID);
        let out = plugin.on_connect(&player).unwrap();
        assert_eq!(out.console, "[CI] Alice connects from Germany, Berlin");
        assert_eq!(out.chat, "\x04Alice from Germany, Berlin");
    }

    #[test]
    fn connect_without_geo() {
        let plugin = plugin(english_config());
        let player = Player::human("Bob", "10.0.0.2:27005", STEAM_ID);
        let out = plugin.on_connect(&player).unwrap();
        assert_eq!(out.console, "[CI] Bob connects");
        assert_eq!(out.chat, "\x04Bob joined");
    }

    #[test]
    fn city_excluded_by_config() {
        let plugin = plugin(Config {
            city_included: false,
            ..english_config()
        });
        let player = Player::human("Alice", "5.9.0.1", STEAM_ID);
        assert_eq!(
            plugin.on_connect(&player).unwrap().console,
            "[CI] Alice connects from Germany"
        );
    }

    #[test]
    fn disconnect_strips_console_colors() {
        let plugin = plugin(english_config());
        let player = Player::human("Carol", "5.9.0.1:27005", STEAM_ID);
        let out = plugin.on_disconnect(&player).unwrap();
        assert_eq!(out.console, "[CI] Carol disconnected");
        assert_eq!(out.chat, "\x0FCarol left");
    }

    #[test]
    fn skipped_players() {
        let plugin = plugin(Config {
            immunity_flags: ["@css/generic".to_string()].into_iter().collect(),
            ..english_config()
        });
        let base = Player::human("X", "5.9.0.1:27005", STEAM_ID);

        let bot = Player { is_bot: true, ..base.clone() };
        let hltv = Player { is_hltv: true, ..base.clone() };
        let invalid = Player { is_valid: false, ..base.clone() };
        let no_steam = Player { steam_id: 0, ..base.clone() };
        let mut admin = base.clone();
        admin.permissions.add("@css/root");

        for player in [&bot, &hltv, &invalid, &no_steam, &admin] {
            let mut host = RecordingHost::default();
            plugin.handle_connect(player, &mut host);
            plugin.handle_disconnect(player, &mut host);
            assert!(host.console.is_empty(), "{player:?}");
            assert!(host.chat.is_empty(), "{player:?}");
        }
    }

    #[test]
    fn handle_emits_console_and_chat() {
        let plugin = plugin(english_config());
        let mut host = RecordingHost::default();
        let player = Player::human("Dave", "5.9.0.1:27005", STEAM_ID);

        plugin.handle_connect(&player, &mut host);
        plugin.handle_disconnect(&player, &mut host);

        assert_eq!(host.console.len(), 2);
        assert_eq!(host.chat, vec!["\x04Dave from Germany, Berlin", "\x0FDave left"]);
    }

    #[test]
    fn custom_immunity_predicate() {
        struct EveryoneImmune;
        impl Immunity for EveryoneImmune {
            fn is_immune(&self, _player: &Player) -> bool {
                true
            }
        }

        let plugin = plugin(english_config()).with_immunity(Box::new(EveryoneImmune));
        let player = Player::human("Eve", "5.9.0.1:27005", STEAM_ID);
        assert!(plugin.on_connect(&player).is_none());
    }

    #[test]
    fn load_without_database_still_announces() {
        let plugin = ConnectInfo::load(
            english_config(),
            Path::new("/nonexistent/plugins/ConnectInfo"),
        );
        assert!(!plugin.resolver().is_available());
        let player = Player::human("Frank", "5.9.0.1:27005", STEAM_ID);
        assert_eq!(plugin.on_connect(&player).unwrap().chat, "\x04Frank joined");
    }

    #[test]
    fn load_opens_configured_database() {
        let fixture = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("maxmind")
            .join("GeoLite2-City.mmdb");
        let config = Config {
            database_path: Some(fixture),
            ..english_config()
        };
        let plugin = ConnectInfo::load(config, Path::new("/nonexistent/plugins/ConnectInfo"));
        assert!(plugin.resolver().is_available());

        let player = Player::human("Grace", "5.9.0.1:27005", STEAM_ID);
        assert_eq!(
            plugin.on_connect(&player).unwrap().console,
            "[CI] Grace connects from Germany, Berlin"
        );
    }

    #[test]
    fn steam_account_length() {
        assert!(Player::human("a", "", STEAM_ID).has_steam_account());
        assert!(!Player::human("a", "", 12345).has_steam_account());
    }

    #[test]
    fn no_immunity_never_hides() {
        let mut admin = Player::human("a", "", STEAM_ID);
        admin.permissions.add("@css/root");
        assert!(is_announceable(&admin, &NoImmunity));
        assert!(!is_announceable(&admin, &FlagImmunity::new(["@css/ban"])));
    }
}
