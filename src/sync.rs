//! Term synchronization driver.
//!
//! A full run is four sequential passes:
//! 1. upsert every local row without links,
//! 2. upsert a stub for every external term that has no local row,
//! 3. patch links onto every local row,
//! 4. patch parent links onto every external stub.
//!
//! Passes 1 and 2 finish before any link is resolved, so every term a link
//! can point at already exists remotely. Per-term failures are recorded in
//! the [`SyncReport`] and never stop the run.

use crate::client::TermApi;
use crate::loader::TermEntries;
use crate::logging::pass_span;
use crate::mapper::{MapContext, MapOptions, map_row};
use crate::model::{TermPayload, TermRow};
use crate::obo::ExternalOntology;
use serde::Serialize;
use tracing::Instrument;

pub const STATUS_PATCHED: u16 = 200;
pub const STATUS_CREATED: u16 = 201;

/// Passes run in declaration order; `Resubmit` only runs on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPass {
    /// Local rows without parent or relation fields, patch then create.
    LocalEntities,
    /// External terms as label and definition stubs.
    ExternalStubs,
    /// Local rows again with parents and relations resolved.
    LocalLinks,
    /// External terms with their parents.
    ExternalLinks,
    /// Full local rows for the requested IDs, patch only.
    Resubmit,
}

impl std::fmt::Display for SyncPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncPass::LocalEntities => write!(f, "local_entities"),
            SyncPass::ExternalStubs => write!(f, "external_stubs"),
            SyncPass::LocalLinks => write!(f, "local_links"),
            SyncPass::ExternalLinks => write!(f, "external_links"),
            SyncPass::Resubmit => write!(f, "resubmit"),
        }
    }
}

/// Result of one create or patch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// HTTP status, or `None` when the request failed in transport.
    pub status: Option<u16>,
    /// The payload as sent, for diagnostics.
    pub body: String,
}

impl SubmitOutcome {
    pub fn is(&self, expected: u16) -> bool {
        self.status == Some(expected)
    }
}

/// A term that could not be synchronized in some pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadEntry {
    pub id: String,
    pub pass: SyncPass,
    pub status: Option<u16>,
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassStats {
    pub pass: SyncPass,
    /// Terms for which at least one request was sent.
    pub attempted: usize,
    /// Answered 200 to the patch.
    pub patched: usize,
    /// Answered 201 to the fallback create.
    pub created: usize,
    /// Ended up in the report's bad entries.
    pub failed: usize,
    /// Not sent, e.g. external terms that also have a local row.
    pub skipped: usize,
}

impl PassStats {
    fn new(pass: SyncPass) -> Self {
        Self {
            pass,
            attempted: 0,
            patched: 0,
            created: 0,
            failed: 0,
            skipped: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub passes: Vec<PassStats>,
    pub bad_entries: Vec<BadEntry>,
}

impl SyncReport {
    pub fn pass(&self, pass: SyncPass) -> Option<&PassStats> {
        self.passes.iter().find(|stats| stats.pass == pass)
    }

    pub fn bad_ids(&self) -> Vec<&str> {
        self.bad_entries.iter().map(|entry| entry.id.as_str()).collect()
    }

    pub fn is_clean(&self) -> bool {
        self.bad_entries.is_empty()
    }

    /// Logs the per-pass summary and every bad entry.
    pub fn log_summary(&self) {
        for stats in &self.passes {
            tracing::info!(
                pass = %stats.pass,
                attempted = stats.attempted,
                patched = stats.patched,
                created = stats.created,
                failed = stats.failed,
                skipped = stats.skipped,
                "pass complete"
            );
        }
        if self.bad_entries.is_empty() {
            tracing::info!("all terms synchronized");
        } else {
            tracing::warn!(count = self.bad_entries.len(), ids = ?self.bad_ids(), "bad entries");
        }
    }
}

/// Submits mapped rows to a [`TermApi`].
pub struct SyncDriver<'a, A: TermApi + ?Sized> {
    api: &'a A,
    ctx: MapContext<'a>,
    revision_message: &'a str,
}

impl<'a, A: TermApi + ?Sized> SyncDriver<'a, A> {
    pub fn new(api: &'a A, ctx: MapContext<'a>, revision_message: &'a str) -> Self {
        Self {
            api,
            ctx,
            revision_message,
        }
    }

    /// Sends one payload. Create expects 201, patch expects 200; transport
    /// failures come back as a `None` status.
    pub async fn sync_term(&self, payload: &TermPayload, create: bool) -> SubmitOutcome {
        let body = payload.to_json_string();
        let result = if create {
            self.api.create_term(payload).await
        } else {
            match payload.id.as_deref() {
                Some(id) => self.api.patch_term(id, payload).await,
                None => {
                    tracing::error!(payload = %body, "cannot patch a term without id");
                    return SubmitOutcome { status: None, body };
                }
            }
        };

        match result {
            Ok(status) => SubmitOutcome {
                status: Some(status),
                body,
            },
            Err(error) => {
                tracing::error!(term_id = ?payload.id, create, %error, "request failed");
                SubmitOutcome { status: None, body }
            }
        }
    }

    /// Runs all four passes.
    #[tracing::instrument(skip_all, fields(local = entries.len()))]
    pub async fn run(
        &self,
        entries: &TermEntries,
        external: Option<&ExternalOntology>,
    ) -> SyncReport {
        let mut report = SyncReport::default();
        let bad = &mut report.bad_entries;

        let stats = async {
            let mut stats = PassStats::new(SyncPass::LocalEntities);
            for row in entries.rows() {
                self.upsert(row, &mut stats, bad).await;
            }
            stats
        }
        .instrument(pass_span(SyncPass::LocalEntities))
        .await;
        report.passes.push(stats);

        if let Some(ontology) = external {
            let stats = async {
                let mut stats = PassStats::new(SyncPass::ExternalStubs);
                for term in ontology.terms() {
                    if entries.contains(&term.id) {
                        stats.skipped += 1;
                        continue;
                    }
                    let row = TermRow::from_external(term);
                    self.upsert(&row, &mut stats, bad).await;
                }
                stats
            }
            .instrument(pass_span(SyncPass::ExternalStubs))
            .await;
            report.passes.push(stats);
        }

        let stats = async {
            let mut stats = PassStats::new(SyncPass::LocalLinks);
            for row in entries.rows() {
                self.patch_links(row, self.revision_message, &mut stats, bad)
                    .await;
            }
            stats
        }
        .instrument(pass_span(SyncPass::LocalLinks))
        .await;
        report.passes.push(stats);

        if let Some(ontology) = external {
            let stats = async {
                let mut stats = PassStats::new(SyncPass::ExternalLinks);
                for term in ontology.terms() {
                    if entries.contains(&term.id) {
                        stats.skipped += 1;
                        continue;
                    }
                    let row = TermRow::from_external(term);
                    tracing::debug!(term_id = %term.id, parents = ?row.get("Parent"), "external term links");
                    self.patch_links(&row, self.revision_message, &mut stats, bad)
                        .await;
                }
                stats
            }
            .instrument(pass_span(SyncPass::ExternalLinks))
            .await;
            report.passes.push(stats);
        }

        report.log_summary();
        report
    }

    /// Re-patches selected local terms, links included, with `message` as the
    /// revision note. IDs without a local row are reported as bad.
    pub async fn resubmit(&self, entries: &TermEntries, ids: &[String], message: &str) -> SyncReport {
        let mut report = SyncReport::default();
        let mut stats = PassStats::new(SyncPass::Resubmit);

        for id in ids {
            let Some(row) = entries.get(id) else {
                tracing::warn!(term_id = %id, "id not found in entries");
                stats.failed += 1;
                report.bad_entries.push(BadEntry {
                    id: id.clone(),
                    pass: SyncPass::Resubmit,
                    status: None,
                    payload: String::new(),
                });
                continue;
            };
            self.patch_links(row, message, &mut stats, &mut report.bad_entries)
                .await;
        }

        report.passes.push(stats);
        report.log_summary();
        report
    }

    /// Patch, falling back to create; only a failed create marks the term bad.
    async fn upsert(&self, row: &TermRow, stats: &mut PassStats, bad: &mut Vec<BadEntry>) {
        let Some(id) = row.id() else {
            return;
        };
        stats.attempted += 1;

        let patch = map_row(row, self.ctx, MapOptions::patch(self.revision_message));
        let outcome = self.sync_term(&patch, false).await;
        if outcome.is(STATUS_PATCHED) {
            stats.patched += 1;
            return;
        }
        tracing::debug!(term_id = id, status = ?outcome.status, "patch failed, trying create");

        let create = map_row(row, self.ctx, MapOptions::create(self.revision_message));
        let outcome = self.sync_term(&create, true).await;
        if outcome.is(STATUS_CREATED) {
            stats.created += 1;
            return;
        }

        tracing::warn!(term_id = id, status = ?outcome.status, payload = %outcome.body, "problem creating term");
        stats.failed += 1;
        bad.push(BadEntry {
            id: id.to_string(),
            pass: stats.pass,
            status: outcome.status,
            payload: outcome.body,
        });
    }

    /// Link patches never fall back to create.
    async fn patch_links(
        &self,
        row: &TermRow,
        revision_message: &str,
        stats: &mut PassStats,
        bad: &mut Vec<BadEntry>,
    ) {
        let Some(id) = row.id() else {
            return;
        };
        stats.attempted += 1;

        let payload = map_row(
            row,
            self.ctx,
            MapOptions::patch(revision_message).with_links(true),
        );
        let outcome = self.sync_term(&payload, false).await;
        if outcome.is(STATUS_PATCHED) {
            stats.patched += 1;
            return;
        }

        tracing::warn!(term_id = id, status = ?outcome.status, payload = %outcome.body, "problem patching term");
        stats.failed += 1;
        bad.push(BadEntry {
            id: id.to_string(),
            pass: stats.pass,
            status: outcome.status,
            payload: outcome.body,
        });
    }
}
