//! Label to term ID index used to resolve relation columns.

use crate::loader::TermEntries;
use crate::obo::ExternalOntology;
use std::collections::{HashMap, HashSet};

/// Built once after every source is loaded, then only queried.
#[derive(Debug, Clone, Default)]
pub struct LabelIndex {
    by_label: HashMap<String, String>,
    known_ids: HashSet<String>,
}

impl LabelIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// External labels go in first so that local labels win on collision.
    pub fn build(entries: &TermEntries, external: Option<&ExternalOntology>) -> Self {
        let mut index = Self::new();
        if let Some(ontology) = external {
            for term in ontology.terms() {
                index.add_id(&term.id);
                if let Some(name) = term.name.as_deref() {
                    index.add_label(name, &term.id);
                }
            }
        }
        for (id, row) in entries.iter() {
            index.add_id(id);
            if let Some(label) = row.get("Label") {
                index.add_label(label, id);
            }
        }
        tracing::debug!(
            labels = index.by_label.len(),
            ids = index.known_ids.len(),
            "built label index"
        );
        index
    }

    pub fn add_label(&mut self, label: &str, id: &str) {
        let label = label.trim();
        if label.is_empty() {
            return;
        }
        if let Some(previous) = self.by_label.insert(label.to_string(), id.to_string())
            && previous != id
        {
            tracing::debug!(label, previous = %previous, id, "label reassigned");
        }
    }

    pub fn add_id(&mut self, id: &str) {
        let id = id.trim();
        if !id.is_empty() {
            self.known_ids.insert(id.to_string());
        }
    }

    /// Resolves a label, or an already-known term ID, to a term ID.
    pub fn resolve(&self, label_or_id: &str) -> Option<&str> {
        let key = label_or_id.trim();
        if key.is_empty() {
            return None;
        }
        self.by_label
            .get(key)
            .map(String::as_str)
            .or_else(|| self.known_ids.get(key).map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }
}
