use indexmap::IndexMap;

/// Request path to the ordered list of sink URIs it fans out to.
pub type MappingTable = IndexMap<String, Vec<String>>;

/// Snapshot as stored in the distributed hash: path to JSON-encoded sink list.
pub type RawSnapshot = IndexMap<String, String>;

/// Decodes every field of a stored snapshot. Fields whose value is not a JSON
/// array of strings are logged and skipped; the remaining fields are kept.
pub fn decode_snapshot(raw: RawSnapshot) -> (MappingTable, usize) {
    let mut table = MappingTable::with_capacity(raw.len());
    let mut failures = 0;

    for (path, value) in raw {
        match serde_json::from_str::<Vec<String>>(&value) {
            Ok(sinks) => {
                table.insert(path, sinks);
            }
            Err(e) => {
                failures += 1;
                tracing::error!(%path, error = %e, "skipping malformed mapping entry");
            }
        }
    }

    (table, failures)
}

pub fn encode_sinks(sinks: &[String]) -> Result<String, serde_json::Error> {
    serde_json::to_string(sinks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_snapshot_skips_bad_fields() {
        let raw = RawSnapshot::from([
            ("/a".to_string(), r#"["http://sink1/x","http://sink2/y"]"#.to_string()),
            ("/b".to_string(), "{not json".to_string()),
            ("/c".to_string(), r#"[1, 2]"#.to_string()),
            ("/d".to_string(), "[]".to_string()),
        ]);

        let (table, failures) = decode_snapshot(raw);
        assert_eq!(failures, 2);
        assert_eq!(table.len(), 2);
        assert_eq!(table["/a"], vec!["http://sink1/x", "http://sink2/y"]);
        assert!(table["/d"].is_empty());
        assert!(!table.contains_key("/b"));
    }

    #[test]
    fn test_encode_sinks() {
        let sinks = vec!["http://sink1/x".to_string()];
        assert_eq!(encode_sinks(&sinks).unwrap(), r#"["http://sink1/x"]"#);
    }
}
