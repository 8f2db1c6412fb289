use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::DEFAULT_PAGE_SIZE;
use crate::prefix::{DEFAULT_RESERVED_MARKER, DEFAULT_RESERVED_NAMESPACE};

const DEFAULT_API_BASE_URL: &str = "https://api.addictovocab.org/";
const DEFAULT_PREFIX_FILE: &str = "scripts/prefix_to_uri_dictionary.csv";
const DEFAULT_DATA_DIR: &str = "outputs";
const DEFAULT_EXTERNAL_ONTOLOGY: &str = "addicto_external.obo";
const DEFAULT_REVISION_MESSAGE: &str = "Minor update";
const DEFAULT_RESUBMIT_MESSAGE: &str = "Final checks completed";

/// What a run does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncCommand {
    Sync,
    Resubmit { ids: Vec<String>, message: String },
    ListIds { label: String, page_size: usize },
    Delete { ids: Vec<String> },
}

/// Resolved settings for one run. Paths are absolute or joined onto
/// `workspace_root`.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub command: SyncCommand,
    /// Service root; `terms` is joined onto it.
    pub api_base_url: String,
    pub workspace_root: PathBuf,
    /// CSV with `PREFIX` and `URI_PREFIX` columns.
    pub prefix_file: PathBuf,
    /// Directory searched recursively for term CSVs.
    pub data_dir: PathBuf,
    /// `None` when external terms are disabled.
    pub external_ontology: Option<PathBuf>,
    /// Set when the ontology path came from the CLI, env or a config file.
    pub external_ontology_explicit: bool,
    /// Sent as `revisionMessage` on every sync patch.
    pub revision_message: String,
    /// ID substring marking terms that live in `reserved_namespace`.
    pub reserved_marker: String,
    pub reserved_namespace: String,
    /// Per-request HTTP timeout. `None` keeps the client's default of no timeout.
    pub timeout: Option<Duration>,
}

impl SyncConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            api_base_url: cli_api_base_url,
            workspace_root: cli_workspace_root,
            prefix_file: cli_prefix_file,
            data_dir: cli_data_dir,
            external_ontology: cli_external_ontology,
            no_external,
            revision_message: cli_revision_message,
            reserved_marker: cli_reserved_marker,
            reserved_namespace: cli_reserved_namespace,
            timeout_secs: cli_timeout_secs,
            command,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            api_base_url: file_api_base_url,
            workspace_root: file_workspace_root,
            prefix_file: file_prefix_file,
            data_dir: file_data_dir,
            external_ontology: file_external_ontology,
            revision_message: file_revision_message,
            reserved_marker: file_reserved_marker,
            reserved_namespace: file_reserved_namespace,
            timeout_secs: file_timeout_secs,
            resubmit: file_resubmit,
        } = file_config;

        let mut api_base_url = cli_api_base_url
            .or(file_api_base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim()
            .to_string();
        if !api_base_url.ends_with('/') {
            api_base_url.push('/');
        }

        let workspace_root = cli_workspace_root
            .or(file_workspace_root)
            .unwrap_or_else(|| PathBuf::from("."));

        let resolve = |path: PathBuf| -> PathBuf {
            if path.is_absolute() {
                path
            } else {
                workspace_root.join(path)
            }
        };

        let prefix_file = resolve(
            cli_prefix_file
                .or(file_prefix_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PREFIX_FILE)),
        );
        let data_dir = resolve(
            cli_data_dir
                .or(file_data_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        );

        let configured_ontology = cli_external_ontology.or(file_external_ontology);
        let external_ontology_explicit = configured_ontology.is_some() && !no_external;
        let external_ontology = if no_external {
            None
        } else {
            Some(resolve(
                configured_ontology.unwrap_or_else(|| PathBuf::from(DEFAULT_EXTERNAL_ONTOLOGY)),
            ))
        };

        let revision_message = cli_revision_message
            .or(file_revision_message)
            .unwrap_or_else(|| DEFAULT_REVISION_MESSAGE.to_string());
        let reserved_marker = cli_reserved_marker
            .or(file_reserved_marker)
            .unwrap_or_else(|| DEFAULT_RESERVED_MARKER.to_string());
        let reserved_namespace = cli_reserved_namespace
            .or(file_reserved_namespace)
            .unwrap_or_else(|| DEFAULT_RESERVED_NAMESPACE.to_string());
        let timeout = cli_timeout_secs
            .or(file_timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let file_resubmit = file_resubmit.unwrap_or_default();
        let command = match command.unwrap_or(Command::Sync) {
            Command::Sync => SyncCommand::Sync,
            Command::Resubmit { ids, message } => {
                let ids = if ids.is_empty() { file_resubmit.ids } else { ids };
                let ids = normalize_ids(ids);
                anyhow::ensure!(
                    !ids.is_empty(),
                    "resubmit needs at least one id (use --id or resubmit.ids in the config file)"
                );
                SyncCommand::Resubmit {
                    ids,
                    message: message
                        .or(file_resubmit.message)
                        .unwrap_or_else(|| DEFAULT_RESUBMIT_MESSAGE.to_string()),
                }
            }
            Command::ListIds { label, page_size } => SyncCommand::ListIds {
                label: label.unwrap_or_default(),
                page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1),
            },
            Command::Delete { ids } => {
                let ids = normalize_ids(ids);
                anyhow::ensure!(!ids.is_empty(), "delete needs at least one id");
                SyncCommand::Delete { ids }
            }
        };

        Ok(Self {
            command,
            api_base_url,
            workspace_root,
            prefix_file,
            data_dir,
            external_ontology,
            external_ontology_explicit,
            revision_message,
            reserved_marker,
            reserved_namespace,
            timeout,
        })
    }

    /// Checks inputs the selected command needs before any request is sent.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"),
            "api base url {:?} must be http or https",
            self.api_base_url
        );
        if !self.needs_local_inputs() {
            return Ok(());
        }

        anyhow::ensure!(
            self.workspace_root.is_dir(),
            "workspace root {:?} is not a directory",
            self.workspace_root
        );
        anyhow::ensure!(
            self.prefix_file.is_file(),
            "prefix file {:?} does not exist",
            self.prefix_file
        );
        anyhow::ensure!(
            self.data_dir.is_dir(),
            "data directory {:?} does not exist",
            self.data_dir
        );
        if self.external_ontology_explicit
            && let Some(path) = self.external_ontology.as_ref()
        {
            anyhow::ensure!(path.is_file(), "external ontology {:?} does not exist", path);
        }
        Ok(())
    }

    /// Whether the command reads the prefix map and term files.
    pub fn needs_local_inputs(&self) -> bool {
        matches!(self.command, SyncCommand::Sync | SyncCommand::Resubmit { .. })
    }
}

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "vocab-sync",
    about = "Synchronize vocabulary CSVs and an external OBO ontology into a vocabulary service",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "VOCAB_SYNC_API_URL",
        value_name = "URL",
        help = "Base URL of the vocabulary service API",
        global = true
    )]
    pub api_base_url: Option<String>,

    #[arg(
        long,
        env = "VOCAB_SYNC_WORKSPACE",
        value_name = "DIR",
        help = "Directory that relative input paths are resolved against",
        global = true
    )]
    pub workspace_root: Option<PathBuf>,

    #[arg(
        long,
        env = "VOCAB_SYNC_PREFIX_FILE",
        value_name = "FILE",
        help = "CSV mapping PREFIX to URI_PREFIX",
        global = true
    )]
    pub prefix_file: Option<PathBuf>,

    #[arg(
        long,
        env = "VOCAB_SYNC_DATA_DIR",
        value_name = "DIR",
        help = "Directory tree of term CSV files",
        global = true
    )]
    pub data_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "VOCAB_SYNC_EXTERNAL_ONTOLOGY",
        value_name = "FILE",
        help = "External ontology in OBO format",
        global = true
    )]
    pub external_ontology: Option<PathBuf>,

    #[arg(long, help = "Skip external ontology terms", global = true)]
    pub no_external: bool,

    #[arg(
        long,
        value_name = "MSG",
        help = "Revision message attached to patches of published terms",
        global = true
    )]
    pub revision_message: Option<String>,

    #[arg(
        long,
        value_name = "MARKER",
        help = "IDs containing this marker get a fixed-namespace URI",
        global = true
    )]
    pub reserved_marker: Option<String>,

    #[arg(
        long,
        value_name = "URI",
        help = "Namespace used for IDs carrying the reserved marker",
        global = true
    )]
    pub reserved_namespace: Option<String>,

    #[arg(
        long,
        env = "VOCAB_SYNC_TIMEOUT_SECS",
        value_name = "SECS",
        help = "HTTP request timeout in seconds (no timeout when unset or 0)",
        value_parser = clap::value_parser!(u64),
        global = true
    )]
    pub timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create or update every term, then patch in links
    Sync,
    /// Re-patch selected terms with a custom revision message
    Resubmit {
        #[arg(long = "id", value_name = "ID", help = "Term ID to re-submit (repeatable)")]
        ids: Vec<String>,
        #[arg(long, value_name = "MSG", help = "Revision message for the re-submitted terms")]
        message: Option<String>,
    },
    /// Print every term ID known to the service
    ListIds {
        #[arg(long, value_name = "LABEL", help = "Only list terms matching this label")]
        label: Option<String>,
        #[arg(long, value_name = "N", help = "Items requested per page")]
        page_size: Option<usize>,
    },
    /// Delete terms from the service
    Delete {
        #[arg(value_name = "ID", required = true)]
        ids: Vec<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    api_base_url: Option<String>,
    workspace_root: Option<PathBuf>,
    prefix_file: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    external_ontology: Option<PathBuf>,
    revision_message: Option<String>,
    reserved_marker: Option<String>,
    reserved_namespace: Option<String>,
    timeout_secs: Option<u64>,
    resubmit: Option<ResubmitConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct ResubmitConfig {
    #[serde(default)]
    ids: Vec<String>,
    message: Option<String>,
}

fn normalize_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
