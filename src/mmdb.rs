use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Read;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use maxminddb::Reader;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::language::Language;

/// File name of the city database inside the shared GeoIP directory.
pub const CITY_DB_FILENAME: &str = "GeoLite2-City.mmdb";

/// Location of the shared database relative to the plugin directory.
pub const DEFAULT_RELATIVE_PATH: &str = "../../shared/GeoLite2-City.mmdb";

/// Where the database is expected for a plugin installed in `plugin_dir`.
#[must_use]
pub fn default_database_path(plugin_dir: &Path) -> PathBuf {
    plugin_dir.join(DEFAULT_RELATIVE_PATH)
}

/// Language code to localized name, as stored in a GeoLite2 `names` map.
///
/// Empty names are dropped when the map is built, so `get` never returns `""`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct LocalizedNames(BTreeMap<String, String>);

impl From<BTreeMap<String, String>> for LocalizedNames {
    fn from(mut names: BTreeMap<String, String>) -> Self {
        names.retain(|_, name| !name.trim().is_empty());
        LocalizedNames(names)
    }
}

impl From<LocalizedNames> for BTreeMap<String, String> {
    fn from(names: LocalizedNames) -> Self {
        names.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LocalizedNames {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect::<BTreeMap<_, _>>()
            .into()
    }
}

impl LocalizedNames {
    #[must_use]
    pub fn get(&self, language: Language) -> Option<&str> {
        self.0.get(language.code()).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Decoded city-database record.
///
/// Either part may be empty: anycast and some carrier ranges carry a country
/// but no city.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CityRecord", into = "CityRecord")]
pub struct GeoRecord {
    pub country: LocalizedNames,
    pub city: LocalizedNames,
}

impl GeoRecord {
    #[must_use]
    pub fn new(country: LocalizedNames, city: LocalizedNames) -> Self {
        GeoRecord { country, city }
    }
}

/// On-disk shape of the parts of a GeoLite2-City record we read.
/// Every other field in the record is skipped by serde.
#[derive(Clone, Default, Serialize, Deserialize)]
struct CityRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    country: Option<Place>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    city: Option<Place>,
}

#[derive(Clone, Default, Serialize, Deserialize)]
struct Place {
    #[serde(default)]
    names: LocalizedNames,
}

impl From<CityRecord> for GeoRecord {
    fn from(raw: CityRecord) -> Self {
        GeoRecord {
            country: raw.country.map(|p| p.names).unwrap_or_default(),
            city: raw.city.map(|p| p.names).unwrap_or_default(),
        }
    }
}

impl From<GeoRecord> for CityRecord {
    fn from(record: GeoRecord) -> Self {
        let place = |names: LocalizedNames| (!names.is_empty()).then_some(Place { names });
        CityRecord {
            country: place(record.country),
            city: place(record.city),
        }
    }
}

/// Read-only access to an offline geolocation database.
///
/// Implementations must tolerate concurrent `lookup` calls through `&self`.
pub trait LookupDatabase: fmt::Debug + Send + Sync {
    /// Find the record for `ip`. `Ok(None)` means the address is not in the
    /// database (private, reserved or simply unknown).
    fn lookup(&self, ip: IpAddr) -> Result<Option<GeoRecord>>;
}

/// GeoLite2-City database opened once and kept for the process lifetime.
pub struct MaxMindDatabase {
    path: PathBuf,
    reader: Reader<Vec<u8>>,
}

impl fmt::Debug for MaxMindDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaxMindDatabase")
            .field("path", &self.path)
            .field("database_type", &self.reader.metadata.database_type)
            .finish()
    }
}

impl MaxMindDatabase {
    /// Open the database file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DatabaseNotFound`] if the file does not exist and
    /// [`Error::DatabaseOpen`] if it cannot be read as an MMDB file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(Error::DatabaseNotFound { path });
        }
        let reader = Reader::open_readfile(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "opened geolocation database");
        Ok(MaxMindDatabase { path, reader })
    }

    /// Open `GeoLite2-City.mmdb` inside `dir`.
    ///
    /// # Errors
    ///
    /// Same as [`MaxMindDatabase::open`].
    pub fn open_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(dir.as_ref().join(CITY_DB_FILENAME))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn database_type(&self) -> &str {
        &self.reader.metadata.database_type
    }

    /// Build time of the database, seconds since the Unix epoch.
    #[must_use]
    pub fn build_epoch(&self) -> u64 {
        self.reader.metadata.build_epoch
    }
}

impl Drop for MaxMindDatabase {
    fn drop(&mut self) {
        tracing::debug!(path = %self.path.display(), "closed geolocation database");
    }
}

impl LookupDatabase for MaxMindDatabase {
    fn lookup(&self, ip: IpAddr) -> Result<Option<GeoRecord>> {
        let failed = |source| Error::LookupFailed {
            ip: ip.to_string(),
            source,
        };
        let result = self.reader.lookup(ip).map_err(failed)?;
        result.decode::<GeoRecord>().map_err(failed)
    }
}

/// In-memory database keyed by exact address.
///
/// Useful for tests and for hosts that ship a small JSON snapshot instead of
/// the full MMDB file.
#[derive(Debug, Default, Clone)]
pub struct StaticDatabase {
    records: HashMap<IpAddr, GeoRecord>,
}

impl StaticDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ip: IpAddr, record: GeoRecord) -> &mut Self {
        self.records.insert(ip, record);
        self
    }

    #[must_use]
    pub fn with(mut self, ip: IpAddr, record: GeoRecord) -> Self {
        self.insert(ip, record);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Load a snapshot of the form `{ "<ip>": { "country": { "names": {...} }, ... } }`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Snapshot`] if the JSON is malformed or a key is not an
    /// IP address.
    pub fn from_json_reader<R: Read>(rdr: R) -> Result<Self> {
        let records = serde_json::from_reader(rdr).map_err(Error::Snapshot)?;
        Ok(StaticDatabase { records })
    }
}

impl LookupDatabase for StaticDatabase {
    fn lookup(&self, ip: IpAddr) -> Result<Option<GeoRecord>> {
        Ok(self.records.get(&ip).cloned())
    }
}
