//! Reads term CSVs from a directory tree into one ID-keyed collection.

use crate::error::{LoadError, LoadResult};
use crate::model::TermRow;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const TERM_FILE_EXTENSION: &str = "csv";

/// A later row replacing an earlier one with the same ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateId {
    pub id: String,
    pub replaced: Option<PathBuf>,
    pub replaced_by: Option<PathBuf>,
}

/// All local term rows, keyed by term ID in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct TermEntries {
    rows: IndexMap<String, TermRow>,
    duplicates: Vec<DuplicateId>,
}

impl TermEntries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a row under its first-column ID. A later duplicate wins and is
    /// recorded. Rows without an ID are ignored and `false` is returned.
    pub fn insert(&mut self, row: TermRow) -> bool {
        let Some(id) = row.id().map(str::to_string) else {
            return false;
        };
        let replaced_by = row.source.clone();
        if let Some(previous) = self.rows.insert(id.clone(), row) {
            tracing::warn!(
                term_id = %id,
                replaced = ?previous.source,
                replaced_by = ?replaced_by,
                "duplicate term id, later row wins"
            );
            self.duplicates.push(DuplicateId {
                id,
                replaced: previous.source,
                replaced_by,
            });
        }
        true
    }

    pub fn get(&self, id: &str) -> Option<&TermRow> {
        self.rows.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TermRow)> {
        self.rows.iter().map(|(id, row)| (id.as_str(), row))
    }

    pub fn rows(&self) -> impl Iterator<Item = &TermRow> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn duplicates(&self) -> &[DuplicateId] {
        &self.duplicates
    }
}

/// Loads every `*.csv` below `dir`, visiting files in sorted path order.
pub fn load_term_dir(dir: &Path) -> LoadResult<TermEntries> {
    let mut entries = TermEntries::new();
    let mut files = 0usize;

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|source| LoadError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() || !is_term_file(entry.path()) {
            continue;
        }
        let loaded = load_term_file(entry.path(), &mut entries)?;
        tracing::debug!(path = %entry.path().display(), rows = loaded, "loaded term file");
        files += 1;
    }

    tracing::info!(
        dir = %dir.display(),
        files,
        terms = entries.len(),
        duplicates = entries.duplicates().len(),
        "loaded local terms"
    );
    Ok(entries)
}

/// Reads one term CSV into `entries`, returning the number of rows taken.
pub fn load_term_file(path: &Path, entries: &mut TermEntries) -> LoadResult<usize> {
    let csv_error = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;

    let header: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|name| name.trim().to_string())
        .collect();
    if header.iter().all(String::is_empty) {
        tracing::debug!(path = %path.display(), "skipping term file without header");
        return Ok(0);
    }

    let mut loaded = 0;
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let values = record.iter().map(str::to_string).collect();
        let row = TermRow::new(header.clone(), values).with_source(path);
        if entries.insert(row) {
            loaded += 1;
        }
    }
    Ok(loaded)
}

fn is_term_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(true);
    let csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(TERM_FILE_EXTENSION))
        .unwrap_or(false);
    !hidden && csv
}
