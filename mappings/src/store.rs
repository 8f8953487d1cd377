use crate::merge::MappingDiff;
use crate::resolver::{Target, UriCache};
use crate::types::MappingTable;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A sink of a path together with its resolved target, if the URI parsed.
#[derive(Clone, Debug)]
pub struct ResolvedSink {
    pub uri: String,
    pub target: Option<Arc<Target>>,
}

struct StoreInner {
    table: Arc<MappingTable>,
    uris: UriCache,
}

/// The per-process mapping table and the URI cache derived from it.
///
/// Every mutation swaps the table and updates the URI cache under one write
/// lock, so readers see either the old or the new state but never a mix.
#[derive(Clone)]
pub struct MappingStore {
    inner: Arc<RwLock<StoreInner>>,
    // Read by `/ready`. Set once the table holds authoritative data.
    ready: Arc<AtomicBool>,
}

impl MappingStore {
    /// A store fixed from configuration. It is ready immediately.
    pub fn new_static(table: MappingTable) -> Self {
        let store = Self::empty();
        store.replace(table);
        store
    }

    /// A store that stays unready until the first snapshot is applied.
    pub fn new_synchronized() -> Self {
        Self::empty()
    }

    fn empty() -> Self {
        MappingStore {
            inner: Arc::new(RwLock::new(StoreInner {
                table: Arc::new(MappingTable::new()),
                uris: UriCache::new(),
            })),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The current table. Holding the returned `Arc` keeps a consistent view
    /// even while the store is replaced.
    pub fn snapshot(&self) -> Arc<MappingTable> {
        self.inner.read().table.clone()
    }

    /// Captures the sink list of `path` and resolves every sink against the
    /// URI cache. Returns `None` if the path is not mapped.
    pub fn lookup(&self, path: &str) -> Option<Vec<ResolvedSink>> {
        let guard = self.inner.read();
        let sinks = guard.table.get(path)?;

        Some(
            sinks
                .iter()
                .map(|uri| ResolvedSink {
                    uri: uri.clone(),
                    target: guard.uris.get(uri),
                })
                .collect(),
        )
    }

    /// Replaces the whole table and rebuilds the URI cache from scratch.
    pub fn replace(&self, table: MappingTable) {
        let mut guard = self.inner.write();
        guard.uris.clear();
        guard.uris.extend(table.values().flatten());
        guard.table = Arc::new(table);
        self.ready.store(true, Ordering::Relaxed);
    }

    /// Applies a registration to the local table. Used only when no
    /// distributed store is configured.
    pub fn register(&self, endpoint: &str, uri: &str) -> MappingDiff {
        let mut guard = self.inner.write();
        let diff = MappingDiff::plan(&guard.table, endpoint, uri);
        if !diff.is_empty() {
            let mut table = (*guard.table).clone();
            diff.apply(&mut table);
            guard.uris.extend(table.values().flatten());
            guard.table = Arc::new(table);
        }
        diff
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    fn cached_uris(&self) -> usize {
        self.inner.read().uris.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &[&str])]) -> MappingTable {
        entries
            .iter()
            .map(|(path, sinks)| {
                (
                    path.to_string(),
                    sinks.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_lookup_resolves_sinks() {
        let store = MappingStore::new_static(table(&[(
            "/a",
            &["http://sink1/x", "not a uri", "http://sink1/x"],
        )]));
        assert!(store.is_ready());

        let sinks = store.lookup("/a").unwrap();
        assert_eq!(sinks.len(), 3);
        assert_eq!(sinks[0].target.as_ref().unwrap().host, "sink1");
        assert!(sinks[1].target.is_none());
        // duplicates are kept, both resolve
        assert!(sinks[2].target.is_some());

        assert!(store.lookup("/missing").is_none());
    }

    #[test]
    fn test_replace_leaves_no_residue() {
        let store = MappingStore::new_synchronized();
        assert!(!store.is_ready());

        store.replace(table(&[
            ("/a", &["http://sink1/x"]),
            ("/b", &["http://sink2/y"]),
        ]));
        assert!(store.is_ready());
        assert_eq!(store.cached_uris(), 2);

        let held = store.snapshot();
        store.replace(table(&[("/b", &["http://sink3/z"])]));

        assert!(store.lookup("/a").is_none());
        let sinks = store.lookup("/b").unwrap();
        assert_eq!(sinks.len(), 1);
        assert_eq!(sinks[0].uri, "http://sink3/z");
        assert_eq!(store.cached_uris(), 1);

        // a previously captured snapshot is unaffected
        assert_eq!(held.len(), 2);
    }

    #[test]
    fn test_local_register() {
        let store = MappingStore::new_static(table(&[("/a", &["http://sink1/x"])]));

        let diff = store.register("/b", "http://sink1/x");
        assert_eq!(diff.deletions, vec!["/a".to_string()]);

        assert!(store.lookup("/a").is_none());
        let sinks = store.lookup("/b").unwrap();
        assert_eq!(sinks[0].target.as_ref().unwrap().path, "/x");

        let diff = store.register("/b", "http://sink4/w");
        assert!(diff.deletions.is_empty());
        assert_eq!(store.lookup("/b").unwrap().len(), 2);
        assert!(store.lookup("/b").unwrap()[1].target.is_some());
    }
}
