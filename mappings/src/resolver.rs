//! Parses sink URIs into connection targets and memoizes the result per exact
//! URI string. Two spellings of the same address are two distinct entries.

use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

/// A parsed sink URI.
#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    pub scheme: Scheme,
    pub host: String,
    /// Only set when the URI names a port other than the scheme's default.
    pub port: Option<u16>,
    /// Path including the query string, if any.
    pub path: String,
    url: Url,
}

impl Target {
    pub fn parse(uri: &str) -> Option<Target> {
        let url = Url::parse(uri).ok()?;
        let scheme = match url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            _ => return None,
        };
        let host = url.host_str().filter(|h| !h.is_empty())?.to_string();
        let path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        Some(Target {
            scheme,
            host,
            port: url.port(),
            path,
            url,
        })
    }

    /// The full URL an outbound request to this target is sent to.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[derive(Default, Debug)]
pub struct UriCache {
    entries: HashMap<String, Arc<Target>>,
}

impl UriCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the memoized target for `uri`, parsing it on first use.
    /// Malformed URIs return `None` and are not cached.
    pub fn resolve(&mut self, uri: &str) -> Option<Arc<Target>> {
        if let Some(target) = self.entries.get(uri) {
            return Some(target.clone());
        }
        let target = Arc::new(Target::parse(uri)?);
        self.entries.insert(uri.to_string(), target.clone());
        Some(target)
    }

    /// Lookup without parsing.
    pub fn get(&self, uri: &str) -> Option<Arc<Target>> {
        self.entries.get(uri).cloned()
    }

    /// Adds an entry for every URI that is not cached yet.
    pub fn extend<'a, I>(&mut self, uris: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for uri in uris {
            if uri.is_empty() {
                continue;
            }
            if self.resolve(uri).is_none() {
                tracing::warn!(sink = %uri, "unresolvable sink uri");
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        let target = Target::parse("http://sink1:8080/x?a=b").unwrap();
        assert_eq!(target.scheme, Scheme::Http);
        assert_eq!(target.host, "sink1");
        assert_eq!(target.port, Some(8080));
        assert_eq!(target.path, "/x?a=b");

        // default ports are not reported as explicit
        let target = Target::parse("https://sink2:443/y").unwrap();
        assert_eq!(target.scheme, Scheme::Https);
        assert_eq!(target.port, None);

        let target = Target::parse("http://sink3").unwrap();
        assert_eq!(target.port, None);
        assert_eq!(target.path, "/");
    }

    #[test]
    fn test_parse_failures() {
        assert!(Target::parse("not a uri").is_none());
        assert!(Target::parse("sink1/x").is_none());
        assert!(Target::parse("ftp://sink1/x").is_none());
        assert!(Target::parse("http://").is_none());
    }

    #[test]
    fn test_cache_memoizes_exact_strings() {
        let mut cache = UriCache::new();
        let a = cache.resolve("http://sink1/x").unwrap();
        let b = cache.resolve("http://sink1/x").unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        // same address, different spelling
        let c = cache.resolve("http://SINK1:80/x").unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);

        assert!(cache.resolve("::bad::").is_none());
        assert_eq!(cache.len(), 2);
        assert!(cache.get("::bad::").is_none());
    }
}
