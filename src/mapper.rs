//! Maps one term row onto the service's term payload.

use crate::labels::LabelIndex;
use crate::model::{TermLink, TermPayload, TermRow};
use crate::prefix::PrefixMap;
use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;

static RELATION_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^REL '(.*)'$").expect("relation column pattern is valid"));

/// Path under which the service addresses a term in link fields.
const TERM_REF_PREFIX: &str = "/terms/";

/// Recognized input columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    Id,
    Label,
    Definition,
    DefinitionSource,
    LogicalDefinition,
    InformalDefinition,
    SubOntology,
    CuratorNote,
    Synonyms,
    Comment,
    Examples,
    FuzzySet,
    ECigO,
    Curator,
    CurationStatus,
    WhyFuzzy,
    CrossReference,
    BfoEntity,
    Parent,
    Relation(String),
    Unknown(String),
}

impl Column {
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "ID" => Column::Id,
            "Label" => Column::Label,
            "Definition" => Column::Definition,
            "Definition source" => Column::DefinitionSource,
            "Logical definition" => Column::LogicalDefinition,
            "Informal definition" => Column::InformalDefinition,
            "AO sub-ontology" => Column::SubOntology,
            "Curator note" => Column::CuratorNote,
            "Synonyms" => Column::Synonyms,
            "Comment" => Column::Comment,
            "Examples of usage" => Column::Examples,
            "Fuzzy set" => Column::FuzzySet,
            "E-CigO" => Column::ECigO,
            "Curator" => Column::Curator,
            "Curation status" => Column::CurationStatus,
            "Why fuzzy" => Column::WhyFuzzy,
            "Cross reference" => Column::CrossReference,
            "BFO entity" => Column::BfoEntity,
            "Parent" => Column::Parent,
            other => match RELATION_COLUMN.captures(other) {
                Some(caps) => Column::Relation(caps[1].to_string()),
                None => Column::Unknown(other.to_string()),
            },
        }
    }

    /// Link columns are only filled in once every term exists remotely.
    pub fn is_link(&self) -> bool {
        matches!(self, Column::Parent | Column::Relation(_))
    }
}

/// Lookup tables the mapper reads from.
#[derive(Debug, Clone, Copy)]
pub struct MapContext<'a> {
    pub prefixes: &'a PrefixMap,
    pub labels: &'a LabelIndex,
}

/// How a row is being submitted.
#[derive(Debug, Clone, Copy)]
pub struct MapOptions<'a> {
    /// Creating (POST) rather than patching; adds the derived URI.
    pub create: bool,
    /// Populate parent and relation fields.
    pub links: bool,
    /// Attached to patches of published terms.
    pub revision_message: &'a str,
}

impl<'a> MapOptions<'a> {
    pub fn create(revision_message: &'a str) -> Self {
        Self {
            create: true,
            links: false,
            revision_message,
        }
    }

    pub fn patch(revision_message: &'a str) -> Self {
        Self {
            create: false,
            links: false,
            revision_message,
        }
    }

    pub fn with_links(mut self, links: bool) -> Self {
        self.links = links;
        self
    }
}

/// Converts one row into a payload. Blank cells are left out entirely.
pub fn map_row(row: &TermRow, ctx: MapContext<'_>, opts: MapOptions<'_>) -> TermPayload {
    let mut payload = TermPayload::default();

    for (name, raw) in row.cells() {
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }
        let column = Column::parse(name);
        if column.is_link() && !opts.links {
            tracing::trace!(column = name, "link column deferred");
            continue;
        }

        match column {
            Column::Id => {
                payload.id = Some(value.to_string());
                if opts.create {
                    payload.uri = Some(ctx.prefixes.uri_for_id(value));
                }
            }
            Column::Label => payload.label = Some(value.to_string()),
            Column::Definition => payload.definition = Some(value.to_string()),
            Column::DefinitionSource => payload.definition_source = Some(value.to_string()),
            Column::LogicalDefinition => payload.logical_definition = Some(value.to_string()),
            Column::InformalDefinition => payload.informal_definition = Some(value.to_string()),
            Column::SubOntology => payload.addicto_sub_ontology = Some(value.to_string()),
            Column::CuratorNote => payload.curator_note = Some(value.to_string()),
            Column::Synonyms => payload.synonyms = non_empty(split_set(value)),
            Column::Comment => payload.comment = Some(value.to_string()),
            Column::Examples => payload.examples = Some(value.to_string()),
            Column::FuzzySet => payload.fuzzy_set = Some(parse_flag(value)),
            Column::ECigO => payload.e_cig_o = Some(parse_flag(value)),
            Column::CurationStatus => payload.curation_status = Some(value.to_string()),
            Column::WhyFuzzy => payload.fuzzy_explanation = Some(value.to_string()),
            Column::CrossReference => payload.cross_reference = non_empty(split_set(value)),
            Column::Curator | Column::BfoEntity => {}
            Column::Parent => payload.parent_term = resolve_parent(value, ctx.labels),
            Column::Relation(name) => {
                if let Some(link) = resolve_relation(&name, value, ctx.labels) {
                    payload.term_links.push(link);
                }
            }
            Column::Unknown(name) => {
                tracing::debug!(column = %name, "unknown or ignored column");
            }
        }
    }

    if !opts.create && payload.is_published() {
        payload.revision_message = Some(opts.revision_message.to_string());
    }

    payload
}

/// Splits a `;`-separated cell into a set, trimming and dropping blanks.
pub fn split_set(value: &str) -> IndexSet<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads a flag cell: integers by value, any other non-blank text as true,
/// blank as false.
pub fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }
    if let Ok(number) = value.parse::<i64>() {
        return number != 0;
    }
    true
}

/// First candidate that resolves to a known term, as a term reference.
fn resolve_parent(value: &str, labels: &LabelIndex) -> Option<String> {
    for candidate in split_set(value) {
        match labels.resolve(&candidate) {
            Some(id) => return Some(term_ref(id)),
            None => tracing::warn!(label = %candidate, "no id found for parent, skipping"),
        }
    }
    tracing::warn!(value, "no usable parent found");
    None
}

fn resolve_relation(name: &str, value: &str, labels: &LabelIndex) -> Option<TermLink> {
    let mut linked = IndexSet::new();
    for candidate in split_set(value) {
        match labels.resolve(&candidate) {
            Some(id) => {
                linked.insert(term_ref(id));
            }
            None => {
                tracing::warn!(relation = name, label = %candidate, "no id found for linked value, skipping")
            }
        }
    }
    if linked.is_empty() {
        return None;
    }
    Some(TermLink {
        link_type: name.to_string(),
        linked_terms: linked.into_iter().collect(),
    })
}

pub fn term_ref(id: &str) -> String {
    format!("{TERM_REF_PREFIX}{id}")
}

fn non_empty(set: IndexSet<String>) -> Option<IndexSet<String>> {
    (!set.is_empty()).then_some(set)
}
