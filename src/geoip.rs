use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::language::{Language, MissingNamePolicy};
use crate::mmdb::{GeoRecord, LocalizedNames, LookupDatabase};

/// Turns a textual address into a display location.
///
/// The resolver holds one shared database handle for its whole life. Every
/// failure is logged here and reported to the caller as "no location", so
/// an announcement can always be produced.
#[derive(Clone, Debug)]
pub struct GeoResolver {
    db: Option<Arc<dyn LookupDatabase>>,
    policy: MissingNamePolicy,
}

impl GeoResolver {
    pub fn new(db: Arc<dyn LookupDatabase>) -> Self {
        Self {
            db: Some(db),
            policy: MissingNamePolicy::default(),
        }
    }

    /// A resolver whose database failed to load. Every lookup yields `None`.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            db: None,
            policy: MissingNamePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: MissingNamePolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.db.is_some()
    }

    /// Resolve a bare IP address to `"Country"` or `"Country, City"`.
    pub fn resolve(&self, ip: &str, language: Language, include_city: bool) -> Option<String> {
        let Some(db) = &self.db else {
            tracing::debug!(ip, "geolocation database unavailable");
            return None;
        };

        let addr: IpAddr = match ip.trim().parse() {
            Ok(addr) => addr,
            Err(err) => {
                tracing::warn!(ip, %err, "cannot parse address");
                return None;
            }
        };

        let record = match db.lookup(addr) {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::info!(ip, "address not found in geolocation database");
                return None;
            }
            Err(err) => {
                tracing::error!(
                    ip,
                    error = %err,
                    cause = ?std::error::Error::source(&err),
                    "geolocation lookup failed"
                );
                return None;
            }
        };

        let location = location_string(&record, language, include_city, self.policy);
        if location.is_empty() {
            tracing::info!(ip, %language, "record has no country name");
            return None;
        }
        Some(location)
    }

    /// Resolve an address as the host reports it, which may carry a port.
    pub fn resolve_address(
        &self,
        address: &str,
        language: Language,
        include_city: bool,
    ) -> Option<String> {
        self.resolve(host_part(address), language, include_city)
    }
}

/// Strip a trailing port from `1.2.3.4:27005` or `[2001:db8::1]:27005`.
///
/// Bare IPv6 addresses are returned unchanged; `[2001:db8::1]` loses its
/// brackets.
#[must_use]
pub fn host_part(address: &str) -> &str {
    let address = address.trim();
    if let Ok(sock) = address.parse::<SocketAddr>() {
        // Slice back into the input to keep the caller's spelling.
        return match sock {
            SocketAddr::V4(_) => address.rsplit_once(':').map_or(address, |(host, _)| host),
            SocketAddr::V6(_) => address
                .strip_prefix('[')
                .and_then(|rest| rest.split_once(']'))
                .map_or(address, |(host, _)| host),
        };
    }
    if address.parse::<IpAddr>().is_ok() {
        return address;
    }
    if let Some(inner) = address
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    {
        if inner.parse::<IpAddr>().is_ok() {
            return inner;
        }
    }
    // Not an address at all; keep the original "split on the first colon".
    address.split(':').next().unwrap_or(address)
}

fn localized<'a>(
    names: &'a LocalizedNames,
    language: Language,
    policy: MissingNamePolicy,
) -> Option<&'a str> {
    names.get(language).or_else(|| match policy {
        MissingNamePolicy::Empty => None,
        MissingNamePolicy::English => names.get(Language::En),
    })
}

/// Build the LocationString for `record`.
///
/// Empty when the country has no name; the city is appended only when it is
/// requested and present.
#[must_use]
pub fn location_string(
    record: &GeoRecord,
    language: Language,
    include_city: bool,
    policy: MissingNamePolicy,
) -> String {
    let Some(country) = localized(&record.country, language, policy) else {
        return String::new();
    };
    match localized(&record.city, language, policy) {
        Some(city) if include_city => format!("{country}, {city}"),
        _ => country.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::mmdb::StaticDatabase;

    fn berlin() -> GeoRecord {
        GeoRecord::new(
            [("en", "Germany"), ("ru", "Германия"), ("de", "Deutschland")]
                .into_iter()
                .collect(),
            [("en", "Berlin"), ("de", "Berlin")].into_iter().collect(),
        )
    }

    fn resolver() -> GeoResolver {
        let db = StaticDatabase::new()
            .with("5.9.0.1".parse().unwrap(), berlin())
            .with(
                "2a01:4f8::1".parse().unwrap(),
                GeoRecord::new(
                    [("en", "Germany")].into_iter().collect(),
                    LocalizedNames::default(),
                ),
            )
            .with("198.51.100.7".parse().unwrap(), GeoRecord::default());
        GeoResolver::new(Arc::new(db))
    }

    #[derive(Debug)]
    struct BrokenDatabase;

    impl LookupDatabase for BrokenDatabase {
        fn lookup(&self, _ip: IpAddr) -> Result<Option<GeoRecord>> {
            Err(Error::Io(std::io::Error::other("corrupt search tree")))
        }
    }

    #[test]
    fn country_and_city() {
        assert_eq!(
            resolver().resolve("5.9.0.1", Language::En, true).as_deref(),
            Some("Germany, Berlin")
        );
    }

    #[test]
    fn city_excluded() {
        assert_eq!(
            resolver().resolve("5.9.0.1", Language::En, false).as_deref(),
            Some("Germany")
        );
    }

    #[test]
    fn country_without_city() {
        assert_eq!(
            resolver().resolve("2a01:4f8::1", Language::En, true).as_deref(),
            Some("Germany")
        );
    }

    #[test]
    fn missing_localized_city_is_dropped() {
        // ru has a country name but no city name.
        assert_eq!(
            resolver().resolve("5.9.0.1", Language::Ru, true).as_deref(),
            Some("Германия")
        );
    }

    #[test]
    fn missing_localized_country_is_no_result() {
        assert_eq!(resolver().resolve("5.9.0.1", Language::Ja, true), None);
    }

    #[test]
    fn english_policy_falls_back() {
        let resolver = resolver().with_policy(MissingNamePolicy::English);
        assert_eq!(
            resolver.resolve("5.9.0.1", Language::Ja, true).as_deref(),
            Some("Germany, Berlin")
        );
        assert_eq!(
            resolver.resolve("5.9.0.1", Language::Ru, true).as_deref(),
            Some("Германия, Berlin")
        );
    }

    #[test]
    fn malformed_addresses() {
        let resolver = resolver();
        for ip in ["", "not an ip", "256.1.1.1", "1.2.3", "::g", "5.9.0.1:27005"] {
            assert_eq!(resolver.resolve(ip, Language::En, true), None, "{ip}");
        }
    }

    #[test]
    fn unknown_and_empty_records() {
        let resolver = resolver();
        assert_eq!(resolver.resolve("192.168.1.10", Language::En, true), None);
        assert_eq!(resolver.resolve("198.51.100.7", Language::En, true), None);
    }

    #[test]
    fn broken_database_degrades() {
        let resolver = GeoResolver::new(Arc::new(BrokenDatabase));
        assert_eq!(resolver.resolve("5.9.0.1", Language::En, true), None);
    }

    #[test]
    fn unavailable_database_degrades() {
        let resolver = GeoResolver::unavailable();
        assert!(!resolver.is_available());
        assert_eq!(resolver.resolve("5.9.0.1", Language::En, true), None);
    }

    #[test]
    fn resolve_address_strips_port() {
        let resolver = resolver();
        assert_eq!(
            resolver
                .resolve_address("5.9.0.1:27005", Language::De, true)
                .as_deref(),
            Some("Deutschland, Berlin")
        );
        assert_eq!(
            resolver
                .resolve_address("[2a01:4f8::1]:27005", Language::En, true)
                .as_deref(),
            Some("Germany")
        );
        assert_eq!(
            resolver
                .resolve_address("[2a01:4f8::1]", Language::En, true)
                .as_deref(),
            Some("Germany")
        );
    }

    #[test]
    fn host_part_forms() {
        assert_eq!(host_part("1.2.3.4:27005"), "1.2.3.4");
        assert_eq!(host_part("1.2.3.4"), "1.2.3.4");
        assert_eq!(host_part("[::1]:27015"), "::1");
        assert_eq!(host_part("[::1]"), "::1");
        assert_eq!(host_part(" [2001:db8::1] "), "2001:db8::1");
        assert_eq!(host_part("[not-an-ip]"), "[not-an-ip]");
        assert_eq!(host_part("2001:db8::1"), "2001:db8::1");
        assert_eq!(host_part("loopback:0"), "loopback");
        assert_eq!(host_part(""), "");
    }

    #[test]
    fn shared_across_threads() {
        let resolver = resolver();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let resolver = resolver.clone();
                std::thread::spawn(move || resolver.resolve("5.9.0.1", Language::En, true))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().as_deref(), Some("Germany, Berlin"));
        }
    }
}
