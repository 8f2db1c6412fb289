//! Data shapes shared by the loader, mapper and sync driver.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Curation status assigned to stub terms created from the external ontology.
pub const PROPOSED_STATUS: &str = "Proposed";

/// Curation status that makes the service demand a revision message on edits.
pub const PUBLISHED_STATUS: &str = "Published";

/// Header used for synthetic rows derived from external ontology terms.
pub const EXTERNAL_HEADER: [&str; 5] = ["ID", "Label", "Definition", "Parent", "Curation status"];

/// One data row from a term CSV, paired with the header it was read under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermRow {
    pub header: Vec<String>,
    pub values: Vec<String>,
    /// File the row was read from; `None` for synthetic rows.
    pub source: Option<PathBuf>,
}

impl TermRow {
    pub fn new(header: Vec<String>, values: Vec<String>) -> Self {
        Self {
            header,
            values,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Term ID, taken from the first column.
    pub fn id(&self) -> Option<&str> {
        self.values
            .first()
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Value of a named column, if present and non-blank.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.header
            .iter()
            .position(|name| name == column)
            .and_then(|idx| self.values.get(idx))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Iterates `(column, value)` pairs in header order.
    pub fn cells(&self) -> impl Iterator<Item = (&str, &str)> {
        self.header
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    /// Builds the synthetic row submitted for an external ontology term.
    pub fn from_external(term: &ExternalTerm) -> Self {
        let header = EXTERNAL_HEADER.iter().map(|h| h.to_string()).collect();
        let values = vec![
            term.id.clone(),
            term.name.clone().unwrap_or_default(),
            term.definition_text(),
            term.parents().collect::<Vec<_>>().join(";"),
            PROPOSED_STATUS.to_string(),
        ];
        Self::new(header, values)
    }
}

/// A typed relation from one term to others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermLink {
    #[serde(rename = "type")]
    pub link_type: String,
    pub linked_terms: Vec<String>,
}

/// JSON document sent to the terms endpoint.
///
/// Absent fields are omitted so that merge-patch leaves them untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logical_definition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub informal_definition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addicto_sub_ontology: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curator_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synonyms: Option<IndexSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuzzy_set: Option<bool>,
    #[serde(rename = "eCigO", skip_serializing_if = "Option::is_none")]
    pub e_cig_o: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curation_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuzzy_explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_reference: Option<IndexSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_term: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub term_links: Vec<TermLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision_message: Option<String>,
}

impl TermPayload {
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn is_published(&self) -> bool {
        self.curation_status.as_deref() == Some(PUBLISHED_STATUS)
    }
}

/// A term node parsed from the external OBO ontology.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalTerm {
    pub id: String,
    pub name: Option<String>,
    pub definition: Option<String>,
    pub comment: Option<String>,
    /// Literal `property_value` annotations as `(property, literal)` pairs.
    pub annotations: Vec<(String, String)>,
    /// Immediate superclass IDs in file order, as written in `is_a` tags.
    pub superclasses: Vec<String>,
    pub obsolete: bool,
}

/// Definition annotation property.
const IAO_DEFINITION: &str = "IAO:0000115";
/// Elucidation annotation property.
const IAO_ELUCIDATION: &str = "IAO:0000600";

impl ExternalTerm {
    /// Definition used for the stub term: `def`, then a definition or
    /// elucidation annotation, then the comment, then the literal `None`.
    pub fn definition_text(&self) -> String {
        if let Some(def) = self.definition.as_deref().filter(|d| !d.is_empty()) {
            return def.to_string();
        }
        let annotated = self.annotations.iter().find_map(|(property, literal)| {
            (property == IAO_DEFINITION || property == IAO_ELUCIDATION).then_some(literal)
        });
        if let Some(literal) = annotated {
            return literal.clone();
        }
        if let Some(comment) = self.comment.as_deref().filter(|c| !c.is_empty()) {
            return comment.to_string();
        }
        "None".to_string()
    }

    /// Immediate superclasses, excluding self references.
    pub fn parents(&self) -> impl Iterator<Item = &str> {
        self.superclasses
            .iter()
            .map(String::as_str)
            .filter(move |parent| *parent != self.id)
    }
}

/// One page of the paginated terms listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TermCollection {
    #[serde(rename = "hydra:totalItems", default)]
    pub total_items: usize,
    #[serde(rename = "hydra:member", default)]
    pub members: Vec<RemoteTerm>,
}

/// A term as returned by the service listing.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteTerm {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
}
