//! Prefix dictionary and ID to URI derivation.

use crate::error::{LoadError, LoadResult};
use std::collections::HashMap;
use std::path::Path;

pub const PREFIX_COLUMN: &str = "PREFIX";
pub const URI_PREFIX_COLUMN: &str = "URI_PREFIX";

pub const DEFAULT_RESERVED_MARKER: &str = "ADDICTO";
pub const DEFAULT_RESERVED_NAMESPACE: &str = "http://addictovocab.org/";

/// Short prefix (`BFO`) to URI prefix (`http://purl.obolibrary.org/obo/BFO`).
#[derive(Debug, Clone)]
pub struct PrefixMap {
    prefixes: HashMap<String, String>,
    reserved_marker: String,
    reserved_namespace: String,
}

impl Default for PrefixMap {
    fn default() -> Self {
        Self {
            prefixes: HashMap::new(),
            reserved_marker: DEFAULT_RESERVED_MARKER.to_string(),
            reserved_namespace: DEFAULT_RESERVED_NAMESPACE.to_string(),
        }
    }
}

impl PrefixMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// IDs containing `marker` get `namespace + id` instead of a prefix lookup.
    pub fn with_reserved(mut self, marker: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.reserved_marker = marker.into();
        self.reserved_namespace = namespace.into();
        self
    }

    pub fn insert(&mut self, prefix: impl Into<String>, uri_prefix: impl Into<String>) {
        self.prefixes.insert(prefix.into(), uri_prefix.into());
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Loads a CSV with `PREFIX` and `URI_PREFIX` columns.
    pub fn from_csv_path(path: &Path) -> LoadResult<Self> {
        let mut reader = csv::Reader::from_path(path).map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let headers = reader
            .headers()
            .map_err(|source| LoadError::Csv {
                path: path.to_path_buf(),
                source,
            })?
            .clone();

        let column = |name: &str| -> LoadResult<usize> {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| LoadError::MissingColumn {
                    path: path.to_path_buf(),
                    column: name.to_string(),
                })
        };
        let prefix_idx = column(PREFIX_COLUMN)?;
        let uri_idx = column(URI_PREFIX_COLUMN)?;

        let mut map = Self::new();
        for record in reader.records() {
            let record = record.map_err(|source| LoadError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
            let (Some(prefix), Some(uri)) = (record.get(prefix_idx), record.get(uri_idx)) else {
                continue;
            };
            let (prefix, uri) = (prefix.trim(), uri.trim());
            if prefix.is_empty() || uri.is_empty() {
                continue;
            }
            map.insert(prefix, uri);
        }

        tracing::info!(path = %path.display(), prefixes = map.len(), "loaded prefix map");
        Ok(map)
    }

    /// Derives the canonical URI for a term ID.
    ///
    /// IDs carrying the reserved marker live under the fixed namespace. Other
    /// IDs are split on `:` (or `_` when there is no colon) and the prefix is
    /// looked up; an unknown prefix yields the raw ID.
    pub fn uri_for_id(&self, id: &str) -> String {
        if !self.reserved_marker.is_empty() && id.contains(&self.reserved_marker) {
            return format!("{}{}", self.reserved_namespace, id);
        }

        let Some((prefix, local)) = id.split_once(':').or_else(|| id.split_once('_')) else {
            tracing::warn!(term_id = id, "cannot determine prefix, using raw id as uri");
            return id.to_string();
        };

        match self.get(prefix) {
            Some(uri_prefix) => format!("{uri_prefix}_{local}"),
            None => {
                tracing::warn!(term_id = id, prefix, "prefix not in dictionary, using raw id as uri");
                id.to_string()
            }
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PrefixMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (prefix, uri) in iter {
            map.insert(prefix, uri);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_ids_use_fixed_namespace() {
        let map = PrefixMap::new();
        assert_eq!(
            map.uri_for_id("ADDICTO:0000308"),
            "http://addictovocab.org/ADDICTO:0000308"
        );
    }

    #[test]
    fn colon_and_underscore_ids_resolve_through_prefix() {
        let map: PrefixMap = [("BFO", "http://x/BFO")].into_iter().collect();
        assert_eq!(map.uri_for_id("BFO:001"), "http://x/BFO_001");
        assert_eq!(map.uri_for_id("BFO_001"), "http://x/BFO_001");
    }

    #[test]
    fn unknown_or_missing_prefix_passes_id_through() {
        let map: PrefixMap = [("BFO", "http://x/BFO")].into_iter().collect();
        assert_eq!(map.uri_for_id("CHEBI:1"), "CHEBI:1");
        assert_eq!(map.uri_for_id("plainid"), "plainid");
    }

    #[test]
    fn custom_reserved_marker() {
        let map = PrefixMap::new().with_reserved("MYO", "https://example.org/");
        assert_eq!(map.uri_for_id("MYO:7"), "https://example.org/MYO:7");
        assert_eq!(map.uri_for_id("ADDICTO:7"), "ADDICTO:7");
    }

    #[test]
    fn loads_csv_and_skips_blank_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefixes.csv");
        std::fs::write(
            &path,
            "PREFIX,URI_PREFIX\nBFO,http://purl.obolibrary.org/obo/BFO\n,\nCHEBI, http://purl.obolibrary.org/obo/CHEBI \n",
        )
        .unwrap();
        let map = PrefixMap::from_csv_path(&path).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("CHEBI"), Some("http://purl.obolibrary.org/obo/CHEBI"));
    }

    #[test]
    fn missing_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefixes.csv");
        std::fs::write(&path, "PREFIX,URI\nBFO,http://x\n").unwrap();
        let err = PrefixMap::from_csv_path(&path).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { ref column, .. } if column == "URI_PREFIX"));
    }
}
