//! Synchronizes curated vocabulary terms into a vocabulary service.
//!
//! Terms come from two sources: CSV files with one row per term, and an
//! external OBO ontology whose terms are submitted as proposed stubs. Both
//! are mapped onto the service's term schema and pushed through its REST
//! API by the [`sync::SyncDriver`].

pub mod client;
pub mod config;
pub mod error;
pub mod labels;
pub mod loader;
pub mod logging;
pub mod mapper;
pub mod model;
pub mod obo;
pub mod prefix;
pub mod sync;

pub use client::{TermApi, VocabClient, list_all_ids};
pub use config::{CliArgs, SyncCommand, SyncConfig};
pub use error::{ApiError, LoadError, OboError};
pub use labels::LabelIndex;
pub use loader::{TermEntries, load_term_dir};
pub use logging::{LoggingConfig, init_logging};
pub use obo::ExternalOntology;
pub use prefix::PrefixMap;
pub use sync::{BadEntry, SyncDriver, SyncPass, SyncReport};

use anyhow::{Context, Result};
use mapper::MapContext;
use serde::Serialize;

/// Everything read from disk for one run.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub prefixes: PrefixMap,
    pub entries: TermEntries,
    pub external: Option<ExternalOntology>,
    pub labels: LabelIndex,
}

impl Inputs {
    pub fn context(&self) -> MapContext<'_> {
        MapContext {
            prefixes: &self.prefixes,
            labels: &self.labels,
        }
    }
}

/// Loads the prefix map, every term CSV and the external ontology, then
/// builds the label index over all of them.
pub fn load_inputs(config: &SyncConfig) -> Result<Inputs> {
    let prefixes = PrefixMap::from_csv_path(&config.prefix_file)
        .context("failed to load prefix dictionary")?
        .with_reserved(&config.reserved_marker, &config.reserved_namespace);

    let entries = load_term_dir(&config.data_dir).context("failed to load term files")?;

    let external = match config.external_ontology.as_deref() {
        Some(path) if path.is_file() => Some(
            ExternalOntology::from_path(path).context("failed to load external ontology")?,
        ),
        Some(path) => {
            tracing::warn!(path = %path.display(), "external ontology not found, skipping external terms");
            None
        }
        None => None,
    };

    let labels = LabelIndex::build(&entries, external.as_ref());

    Ok(Inputs {
        prefixes,
        entries,
        external,
        labels,
    })
}

/// Outcome of deleting one remote term.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResult {
    pub id: String,
    /// `None` when the request never got a response.
    pub status: Option<u16>,
    /// Any 2xx status.
    pub success: bool,
}

impl DeleteResult {
    fn new(id: &str, status: Option<u16>) -> Self {
        Self {
            id: id.to_string(),
            status,
            success: status.is_some_and(|s| (200..300).contains(&s)),
        }
    }
}

/// What a completed command produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Full four-pass synchronization.
    Sync { report: SyncReport },
    /// Re-submission of selected local terms.
    Resubmit { report: SyncReport },
    /// Remote term IDs, in service order.
    ListIds { ids: Vec<String> },
    /// One result per requested ID, in request order.
    Delete { results: Vec<DeleteResult> },
}

/// Runs the configured command against `api`.
pub async fn run_with_api<A: TermApi + ?Sized>(config: &SyncConfig, api: &A) -> Result<RunOutcome> {
    match &config.command {
        SyncCommand::Sync => {
            let inputs = load_inputs(config)?;
            let driver = SyncDriver::new(api, inputs.context(), &config.revision_message);
            let report = driver.run(&inputs.entries, inputs.external.as_ref()).await;
            Ok(RunOutcome::Sync { report })
        }
        SyncCommand::Resubmit { ids, message } => {
            let inputs = load_inputs(config)?;
            let driver = SyncDriver::new(api, inputs.context(), &config.revision_message);
            let report = driver.resubmit(&inputs.entries, ids, message).await;
            Ok(RunOutcome::Resubmit { report })
        }
        SyncCommand::ListIds { label, page_size } => {
            let ids = list_all_ids(api, label, *page_size)
                .await
                .context("failed to list remote terms")?;
            Ok(RunOutcome::ListIds { ids })
        }
        SyncCommand::Delete { ids } => {
            let mut results = Vec::with_capacity(ids.len());
            for id in ids {
                let status = match api.delete_term(id).await {
                    Ok(status) => Some(status),
                    Err(error) => {
                        tracing::error!(term_id = %id, %error, "delete failed");
                        None
                    }
                };
                let result = DeleteResult::new(id, status);
                if result.success {
                    tracing::info!(term_id = %id, status = ?status, "deleted term");
                } else if let Some(status) = status {
                    tracing::warn!(term_id = %id, status, "delete rejected");
                }
                results.push(result);
            }
            Ok(RunOutcome::Delete { results })
        }
    }
}

/// Runs the configured command against the real service.
pub async fn run(config: &SyncConfig) -> Result<RunOutcome> {
    let client = VocabClient::new(&config.api_base_url, config.timeout)
        .context("failed to build vocabulary service client")?;
    tracing::info!(
        api = %client.base_url(),
        command = ?config.command,
        "starting vocabulary sync"
    );
    run_with_api(config, &client).await
}
