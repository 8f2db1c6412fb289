//! External ontology loaded from an OBO 1.4 document.
//!
//! Parsing is done by `fastobo`; this module only walks the resulting
//! frames. `[Term]` frames are kept with the clauses the synchronization
//! needs: `name`, `def`, `comment`, `is_a`, literal `property_value`
//! annotations and `is_obsolete`. Typedef and instance frames are skipped.

use crate::error::{LoadError, LoadResult, OboError};
use crate::model::ExternalTerm;
use fastobo::ast::{EntityFrame, HeaderClause, OboDoc, PropertyValue, TermClause, TermFrame};
use indexmap::IndexMap;
use std::path::Path;

/// Parsed external ontology, terms in file order.
#[derive(Debug, Clone, Default)]
pub struct ExternalOntology {
    /// `ontology:` header value, if any.
    pub name: Option<String>,
    terms: IndexMap<String, ExternalTerm>,
}

impl ExternalOntology {
    pub fn from_path(path: &Path) -> LoadResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let ontology = Self::parse(&text).map_err(|source| LoadError::Ontology {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(
            path = %path.display(),
            terms = ontology.len(),
            "loaded external ontology"
        );
        Ok(ontology)
    }

    pub fn parse(text: &str) -> Result<Self, OboError> {
        let doc = fastobo::from_str(text)?;
        Ok(Self::from_doc(&doc))
    }

    /// Collects every term frame of `doc`. Frames sharing an ID are merged.
    pub fn from_doc(doc: &OboDoc) -> Self {
        let name = doc.header().iter().find_map(|clause| match clause {
            HeaderClause::Ontology(name) => Some(name.as_str().to_string()),
            _ => None,
        });
        let mut ontology = Self {
            name,
            terms: IndexMap::new(),
        };

        for entity in doc.entities() {
            let EntityFrame::Term(frame) = entity else {
                continue;
            };
            let term = term_from_frame(frame);
            match ontology.terms.get_mut(&term.id) {
                Some(existing) => merge_term(existing, term),
                None => {
                    ontology.terms.insert(term.id.clone(), term);
                }
            }
        }
        ontology
    }

    pub fn terms(&self) -> impl Iterator<Item = &ExternalTerm> {
        self.terms.values()
    }

    pub fn get(&self, id: &str) -> Option<&ExternalTerm> {
        self.terms.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.terms.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

fn term_from_frame(frame: &TermFrame) -> ExternalTerm {
    let mut term = ExternalTerm {
        id: frame.id().as_inner().to_string(),
        ..ExternalTerm::default()
    };

    for line in frame.clauses() {
        match line.as_inner() {
            TermClause::Name(name) => term.name = Some(name.as_str().to_string()),
            TermClause::Def(def) => term.definition = Some(def.text().as_str().to_string()),
            TermClause::Comment(comment) => term.comment = Some(comment.as_str().to_string()),
            TermClause::IsA(parent) => {
                let parent = parent.to_string();
                if !term.superclasses.contains(&parent) {
                    term.superclasses.push(parent);
                }
            }
            // Resource values (`seeAlso CHEBI:1`) never carry definition text.
            TermClause::PropertyValue(pv) => {
                if let PropertyValue::Literal(literal) = pv.as_ref() {
                    term.annotations.push((
                        literal.property().to_string(),
                        literal.literal().as_str().to_string(),
                    ));
                }
            }
            TermClause::IsObsolete(obsolete) => term.obsolete = *obsolete,
            _ => {}
        }
    }
    term
}

fn merge_term(existing: &mut ExternalTerm, other: ExternalTerm) {
    existing.name = existing.name.take().or(other.name);
    existing.definition = existing.definition.take().or(other.definition);
    existing.comment = existing.comment.take().or(other.comment);
    existing.annotations.extend(other.annotations);
    for parent in other.superclasses {
        if !existing.superclasses.contains(&parent) {
            existing.superclasses.push(parent);
        }
    }
    existing.obsolete |= other.obsolete;
}
