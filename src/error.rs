use std::path::PathBuf;

/// Error types for the connectinfo library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// MMDB database file was not found at the expected path.
    #[error("database not found: {path}")]
    DatabaseNotFound { path: PathBuf },

    /// MMDB database exists but could not be opened or is corrupt.
    #[error("failed to open database {path}")]
    DatabaseOpen {
        path: PathBuf,
        #[source]
        source: maxminddb::MaxMindDbError,
    },

    /// IP address lookup failed in the MMDB database.
    #[error("lookup failed for {ip}")]
    LookupFailed {
        ip: String,
        #[source]
        source: maxminddb::MaxMindDbError,
    },

    /// A configuration or translation file could not be parsed.
    #[error("invalid config {path}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A JSON snapshot database could not be parsed.
    #[error("invalid database snapshot: {0}")]
    Snapshot(#[source] serde_json::Error),

    /// Language code is not one of the supported set.
    #[error("unsupported language: {code}")]
    UnknownLanguage { code: String },

    /// Color table name is not one of the built-in tables.
    #[error("unknown color table: {name}")]
    UnknownColorTable { name: String },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results using the library error.
pub type Result<T> = std::result::Result<T, Error>;
