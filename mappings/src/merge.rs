//! Registration merge: attaches a sink URI to one path and detaches it from
//! every other path, so that a sink belongs to at most one path.

use crate::types::MappingTable;
use indexmap::IndexMap;

/// The field-level changes a registration makes to a mapping table.
#[derive(Debug, Default, PartialEq)]
pub struct MappingDiff {
    /// Paths whose sink list changed or was created, with the new list.
    pub upserts: IndexMap<String, Vec<String>>,
    /// Paths whose sink list became empty.
    pub deletions: Vec<String>,
}

impl MappingDiff {
    /// Computes the changes needed to register `uri` under `endpoint`.
    pub fn plan(table: &MappingTable, endpoint: &str, uri: &str) -> Self {
        let mut diff = MappingDiff::default();
        let mut endpoint_exists = false;

        for (path, sinks) in table {
            if path == endpoint {
                endpoint_exists = true;
                if !sinks.iter().any(|s| s == uri) {
                    let mut updated = sinks.clone();
                    updated.push(uri.to_string());
                    diff.upserts.insert(path.clone(), updated);
                }
            } else if sinks.iter().any(|s| s == uri) {
                let remaining: Vec<String> =
                    sinks.iter().filter(|s| *s != uri).cloned().collect();
                if remaining.is_empty() {
                    diff.deletions.push(path.clone());
                } else {
                    diff.upserts.insert(path.clone(), remaining);
                }
            }
        }

        if !endpoint_exists {
            diff.upserts
                .insert(endpoint.to_string(), vec![uri.to_string()]);
        }

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletions.is_empty()
    }

    pub fn apply(&self, table: &mut MappingTable) {
        for (path, sinks) in &self.upserts {
            table.insert(path.clone(), sinks.clone());
        }
        for path in &self.deletions {
            table.shift_remove(path);
        }
    }
}
