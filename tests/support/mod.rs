#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use tempfile::{TempDir, tempdir};
use tokio::sync::RwLock;
use vocab_sync::config::SyncCommand;
use vocab_sync::error::ApiResult;
use vocab_sync::model::{RemoteTerm, TermCollection, TermPayload};
use vocab_sync::{ApiError, SyncConfig, TermApi};

// =============================================================================
// Workspace with input files
// =============================================================================

pub struct TestWorkspace {
    _tempdir: TempDir,
    root: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let tempdir = tempdir().expect("tempdir");
        let root = tempdir.path().to_path_buf();
        std::fs::create_dir_all(root.join("outputs")).expect("create outputs");
        Self {
            _tempdir: tempdir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create dir");
        }
        std::fs::write(&path, contents).expect("write file");
        path
    }

    pub fn write_prefixes(&self, rows: &[(&str, &str)]) -> PathBuf {
        let mut csv = String::from("PREFIX,URI_PREFIX\n");
        for (prefix, uri) in rows {
            csv.push_str(&format!("{prefix},{uri}\n"));
        }
        self.write("prefixes.csv", &csv)
    }

    /// Config pointing at this workspace's `prefixes.csv`, `outputs/` and
    /// `external.obo` (if written).
    pub fn config(&self, command: SyncCommand) -> SyncConfig {
        let external = self.path("external.obo");
        SyncConfig {
            command,
            api_base_url: "http://127.0.0.1:9/".to_string(),
            workspace_root: self.root.clone(),
            prefix_file: self.path("prefixes.csv"),
            data_dir: self.path("outputs"),
            external_ontology_explicit: external.exists(),
            external_ontology: external.exists().then_some(external),
            revision_message: "Minor update".to_string(),
            reserved_marker: "ADDICTO".to_string(),
            reserved_namespace: "http://addictovocab.org/".to_string(),
            timeout: Some(std::time::Duration::from_secs(5)),
        }
    }
}

// =============================================================================
// In-memory vocabulary service
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create { id: String, payload: TermPayload },
    Patch { id: String, payload: TermPayload },
    Delete { id: String },
    List { label: String, page: usize, per_page: usize },
}

impl Call {
    pub fn id(&self) -> Option<&str> {
        match self {
            Call::Create { id, .. } | Call::Patch { id, .. } | Call::Delete { id } => Some(id),
            Call::List { .. } => None,
        }
    }

    pub fn payload(&self) -> Option<&TermPayload> {
        match self {
            Call::Create { payload, .. } | Call::Patch { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub fn carries_links(&self) -> bool {
        self.payload()
            .map(|p| p.parent_term.is_some() || !p.term_links.is_empty())
            .unwrap_or(false)
    }
}

/// Behaves like the terms resource: PATCH on an unknown id is 404, POST of an
/// existing id is 400. Individual ids can be made to fail.
#[derive(Default)]
pub struct MockVocabServer {
    terms: RwLock<IndexMap<String, Value>>,
    calls: RwLock<Vec<Call>>,
    reject_create: RwLock<HashSet<String>>,
    reject_patch: RwLock<HashMap<String, u16>>,
    transport_failures: RwLock<HashSet<String>>,
}

impl MockVocabServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, id: &str, document: Value) {
        self.terms.write().await.insert(id.to_string(), document);
    }

    pub async fn reject_create(&self, id: &str) {
        self.reject_create.write().await.insert(id.to_string());
    }

    pub async fn reject_patch(&self, id: &str, status: u16) {
        self.reject_patch.write().await.insert(id.to_string(), status);
    }

    pub async fn fail_transport(&self, id: &str) {
        self.transport_failures.write().await.insert(id.to_string());
    }

    pub async fn term(&self, id: &str) -> Option<Value> {
        self.terms.read().await.get(id).cloned()
    }

    pub async fn term_ids(&self) -> Vec<String> {
        self.terms.read().await.keys().cloned().collect()
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.read().await.clone()
    }

    async fn record(&self, call: Call) {
        self.calls.write().await.push(call);
    }

    async fn transport_check(&self, id: &str) -> ApiResult<()> {
        if self.transport_failures.read().await.contains(id) {
            return Err(ApiError::InvalidUrl(format!("simulated transport failure for {id}")));
        }
        Ok(())
    }
}

fn merge_patch(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                if value.is_null() {
                    target.remove(key);
                } else {
                    merge_patch(target.entry(key.clone()).or_insert(Value::Null), value);
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

#[async_trait]
impl TermApi for MockVocabServer {
    async fn create_term(&self, payload: &TermPayload) -> ApiResult<u16> {
        let id = payload.id.clone().unwrap_or_default();
        self.record(Call::Create {
            id: id.clone(),
            payload: payload.clone(),
        })
        .await;
        self.transport_check(&id).await?;

        if self.reject_create.read().await.contains(&id) {
            return Ok(422);
        }
        let mut terms = self.terms.write().await;
        if id.is_empty() || terms.contains_key(&id) {
            return Ok(400);
        }
        terms.insert(id, serde_json::to_value(payload).expect("payload serializes"));
        Ok(201)
    }

    async fn patch_term(&self, id: &str, payload: &TermPayload) -> ApiResult<u16> {
        self.record(Call::Patch {
            id: id.to_string(),
            payload: payload.clone(),
        })
        .await;
        self.transport_check(id).await?;

        if let Some(status) = self.reject_patch.read().await.get(id) {
            return Ok(*status);
        }
        let mut terms = self.terms.write().await;
        let Some(existing) = terms.get_mut(id) else {
            return Ok(404);
        };
        let patch = serde_json::to_value(payload).expect("payload serializes");
        merge_patch(existing, &patch);
        Ok(200)
    }

    async fn delete_term(&self, id: &str) -> ApiResult<u16> {
        self.record(Call::Delete { id: id.to_string() }).await;
        self.transport_check(id).await?;
        match self.terms.write().await.shift_remove(id) {
            Some(_) => Ok(204),
            None => Ok(404),
        }
    }

    async fn list_terms(
        &self,
        label: &str,
        page: usize,
        per_page: usize,
    ) -> ApiResult<TermCollection> {
        self.record(Call::List {
            label: label.to_string(),
            page,
            per_page,
        })
        .await;
        let terms = self.terms.read().await;
        let matching: Vec<RemoteTerm> = terms
            .iter()
            .filter(|(_, doc)| {
                label.is_empty() || doc.get("label").and_then(Value::as_str) == Some(label)
            })
            .map(|(id, doc)| RemoteTerm {
                id: id.clone(),
                label: doc.get("label").and_then(Value::as_str).map(str::to_string),
            })
            .collect();
        let total_items = matching.len();
        let members = matching
            .into_iter()
            .skip((page.saturating_sub(1)) * per_page)
            .take(per_page)
            .collect();
        Ok(TermCollection {
            total_items,
            members,
        })
    }
}
