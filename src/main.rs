use anyhow::{Context, Error, Result};
use camino::Utf8PathBuf;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tracing_subscriber::EnvFilter;

use connectinfo::config::CONFIG_FILENAME;
use connectinfo::event::PermissionSet;
use connectinfo::mmdb;
use connectinfo::{
    ColorTableKind, Config, ConnectInfo, Host, Language, Messages, MissingNamePolicy, Player,
    Translations,
};

/// Check if the error chain contains a broken pipe error.
fn is_broken_pipe(err: &Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|e| e.kind() == io::ErrorKind::BrokenPipe)
    })
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Plugin install directory. The database defaults to
    /// ../../shared/GeoLite2-City.mmdb from here
    #[clap(
        long,
        value_name = "DIR",
        value_hint = clap::ValueHint::DirPath,
        global = true
    )]
    plugin_dir: Option<Utf8PathBuf>,

    /// Path to the plugin config (JSON). Created with defaults if missing.
    /// Defaults to ConnectInfo.json in --plugin-dir
    #[clap(short, long, value_name = "FILE", global = true)]
    config: Option<Utf8PathBuf>,

    /// Specify directory containing GeoLite2-City.mmdb
    #[clap(
        short = 'I',
        value_name = "DIR",
        value_hint = clap::ValueHint::DirPath,
        env = "GEOIP_MMDB_DIR",
        global = true
    )]
    include: Option<Utf8PathBuf>,

    /// Path to the city database file, overrides -I and the config
    #[clap(long, value_name = "FILE", global = true)]
    database: Option<Utf8PathBuf>,

    /// Language of country and city names (ru, de, es, ja, fr, en)
    #[clap(short, long, global = true)]
    language: Option<Language>,

    /// Do not append the city to the country
    #[clap(long, global = true)]
    no_city: bool,

    /// Fall back to English names when the selected language has none
    #[clap(long, global = true)]
    english_fallback: bool,

    /// Chat color table (chat, legacy, plain)
    #[clap(long, value_name = "TABLE", global = true)]
    color_table: Option<ColorTableKind>,

    /// Directory of <locale>.json translation files
    #[clap(long, value_name = "DIR", global = true)]
    lang_dir: Option<Utf8PathBuf>,

    /// Locale to pick from --lang-dir
    #[clap(long, default_value = "en", global = true)]
    locale: String,

    /// Use colors for the console line
    #[clap(short = 'C', long, value_enum, default_value_t = ArgsColorChoice::Auto, global = true)]
    color: ArgsColorChoice,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the location of each address, one per line
    Resolve {
        #[clap(value_name = "IP", required = true)]
        ips: Vec<String>,
    },
    /// Print the console and chat lines for a player connecting
    Connect {
        #[clap(flatten)]
        player: PlayerArgs,
        /// Remote address, optionally with port
        address: String,
    },
    /// Print the console and chat lines for a player leaving
    Disconnect {
        #[clap(flatten)]
        player: PlayerArgs,
    },
    /// List the mnemonics of the active chat color table
    Colors,
}

#[derive(ClapArgs, Debug)]
struct PlayerArgs {
    /// Player display name
    #[clap(short, long)]
    name: String,

    /// SteamID64 of the player
    #[clap(long, default_value_t = 76561197960265728)]
    steam_id: u64,

    /// Treat the player as a bot
    #[clap(long)]
    bot: bool,

    /// Treat the player as SourceTV
    #[clap(long)]
    hltv: bool,

    /// Permission flag held by the player (repeatable)
    #[clap(long = "flag", value_name = "FLAG")]
    flags: Vec<String>,

    /// Print chat control codes as raw bytes instead of \xNN escapes
    #[clap(long)]
    raw: bool,
}

impl PlayerArgs {
    fn player(&self, address: &str) -> Player {
        Player {
            is_bot: self.bot,
            is_hltv: self.hltv,
            permissions: self.flags.iter().map(String::as_str).collect::<PermissionSet>(),
            ..Player::human(&self.name, address, self.steam_id)
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
enum ArgsColorChoice {
    Always,
    Never,
    Auto,
}

/// Collects host output; chat is released after the event, like a server
/// flushing its next-frame queue.
#[derive(Default)]
struct CliHost {
    console: Vec<String>,
    next_frame: Vec<String>,
}

impl Host for CliHost {
    fn log_console(&mut self, line: &str) {
        self.console.push(line.to_string());
    }

    fn print_to_chat_all_next_frame(&mut self, message: String) {
        self.next_frame.push(message);
    }
}

fn main() -> ExitCode {
    let err = match run_main() {
        Ok(code) => return code,
        Err(err) => err,
    };

    if is_broken_pipe(&err) {
        return ExitCode::SUCCESS;
    }

    if std::env::var("RUST_BACKTRACE").is_ok_and(|v| v == "1") {
        let _ = writeln!(io::stderr(), "{:?}", err);
    } else {
        let _ = writeln!(io::stderr(), "{:#}", err);
    }

    ExitCode::FAILURE
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run_main() -> Result<ExitCode> {
    let mut args = Args::parse();
    init_tracing(args.verbose);

    // Older deployments set MAXMIND_MMDB_DIR.
    if args.include.is_none() {
        if let Ok(legacy_path) = std::env::var("MAXMIND_MMDB_DIR") {
            args.include = Some(Utf8PathBuf::from(legacy_path));
            tracing::warn!("MAXMIND_MMDB_DIR is deprecated, please use GEOIP_MMDB_DIR instead");
        }
    }

    let colormode = match args.color {
        ArgsColorChoice::Auto => {
            if io::stdout().is_terminal() {
                ColorChoice::Always
            } else {
                ColorChoice::Never
            }
        }
        ArgsColorChoice::Always => ColorChoice::Always,
        ArgsColorChoice::Never => ColorChoice::Never,
    };

    let config = load_config(&args)?;
    run(args, config, colormode)?;
    Ok(ExitCode::SUCCESS)
}

fn config_path(args: &Args) -> Option<Utf8PathBuf> {
    args.config
        .clone()
        .or_else(|| args.plugin_dir.as_ref().map(|dir| dir.join(CONFIG_FILENAME)))
}

/// Explicit plugin dir, else the directory holding the config, else `.`.
fn plugin_dir(args: &Args) -> PathBuf {
    if let Some(dir) = &args.plugin_dir {
        return dir.clone().into_std_path_buf();
    }
    args.config
        .as_ref()
        .and_then(|path| path.parent())
        .filter(|dir| !dir.as_str().is_empty())
        .map_or_else(|| PathBuf::from("."), |dir| dir.as_std_path().to_path_buf())
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match config_path(args) {
        Some(path) => Config::load(&path).with_context(|| format!("failed to load config {path}"))?,
        None => Config::default(),
    };
    if let Some(path) = database_override(args)? {
        config.database_path = Some(path);
    }
    if let Some(language) = args.language {
        config.geo_lite_language = language;
    }
    if args.no_city {
        config.city_included = false;
    }
    if args.english_fallback {
        config.missing_name_policy = MissingNamePolicy::English;
    }
    if let Some(table) = args.color_table {
        config.color_table = table;
    }
    Ok(config)
}

/// Database given on the command line, relative to the working directory.
fn database_override(args: &Args) -> Result<Option<PathBuf>> {
    let file = match (&args.database, &args.include) {
        (Some(file), _) => file.as_std_path().to_path_buf(),
        (None, Some(dir)) => dir.as_std_path().join(mmdb::CITY_DB_FILENAME),
        (None, None) => return Ok(None),
    };
    Ok(Some(absolute(&file)?))
}

fn absolute(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}

fn run(args: Args, config: Config, colormode: ColorChoice) -> Result<()> {
    let mut out = StandardStream::stdout(colormode);

    match &args.command {
        Command::Colors => {
            for (token, code) in config.color_table.table().entries() {
                writeln!(out, "{token}\t{}", escape_controls(code))?;
            }
        }
        Command::Resolve { ips } => {
            let language = config.geo_lite_language;
            let city_included = config.city_included;
            let plugin = ConnectInfo::load(config, &plugin_dir(&args));
            for ip in ips {
                let location = plugin
                    .resolver()
                    .resolve_address(ip, language, city_included)
                    .unwrap_or_default();
                writeln!(out, "{location}")?;
            }
        }
        Command::Connect { player, address } => {
            let plugin = build_plugin(&args, config)?;
            let mut host = CliHost::default();
            plugin.handle_connect(&player.player(address), &mut host);
            write_host(&mut out, host, player.raw)?;
        }
        Command::Disconnect { player } => {
            let plugin = build_plugin(&args, config)?;
            let mut host = CliHost::default();
            plugin.handle_disconnect(&player.player(""), &mut host);
            write_host(&mut out, host, player.raw)?;
        }
    }

    out.flush()?;
    Ok(())
}

fn build_plugin(args: &Args, config: Config) -> Result<ConnectInfo> {
    let messages = match &args.lang_dir {
        Some(dir) => {
            let translations = Translations::load_dir(dir)
                .with_context(|| format!("failed to load translations from {dir}"))?;
            Messages::localized(&config, &translations, &args.locale)
        }
        None => Messages::from_config(&config),
    };
    Ok(ConnectInfo::load(config, &plugin_dir(args)).with_messages(messages))
}

fn write_host(out: &mut StandardStream, host: CliHost, raw: bool) -> io::Result<()> {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Magenta)).set_bg(Some(Color::Black));
    for line in &host.console {
        out.set_color(&spec)?;
        write!(out, "{line}")?;
        out.reset()?;
        writeln!(out)?;
    }
    for message in &host.next_frame {
        if raw {
            writeln!(out, "{message}")?;
        } else {
            writeln!(out, "{}", escape_controls(message))?;
        }
    }
    Ok(())
}

/// Show chat control bytes as `\xNN`.
fn escape_controls(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_control() {
            out.push_str(&format!("\\x{:02X}", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}
