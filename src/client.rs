//! REST client for the vocabulary service's `terms` resource.

use crate::error::{ApiError, ApiResult};
use crate::model::{TermCollection, TermPayload};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Url};
use std::time::Duration;

pub const LD_JSON: &str = "application/ld+json";
pub const MERGE_PATCH_JSON: &str = "application/merge-patch+json";

const TERMS_PATH: &str = "terms";
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Operations the sync driver needs from the vocabulary service.
///
/// Methods return the raw HTTP status; deciding what counts as success is
/// left to the caller. `Err` means no response was obtained at all.
#[async_trait]
pub trait TermApi: Send + Sync {
    /// `POST terms`
    async fn create_term(&self, payload: &TermPayload) -> ApiResult<u16>;

    /// `PATCH terms/{id}` with merge-patch semantics
    async fn patch_term(&self, id: &str, payload: &TermPayload) -> ApiResult<u16>;

    /// `DELETE terms/{id}`
    async fn delete_term(&self, id: &str) -> ApiResult<u16>;

    /// `GET terms?label=&page=&itemsPerPage=`
    async fn list_terms(&self, label: &str, page: usize, per_page: usize)
    -> ApiResult<TermCollection>;
}

#[derive(Debug, Clone)]
pub struct VocabClient {
    base_url: Url,
    client: Client,
}

impl VocabClient {
    /// Requests never time out unless `timeout` is set.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> ApiResult<Self> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url =
            Url::parse(&normalized).map_err(|_| ApiError::InvalidUrl(base_url.to_string()))?;
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn terms_url(&self) -> ApiResult<Url> {
        self.base_url
            .join(TERMS_PATH)
            .map_err(|_| ApiError::InvalidUrl(format!("{}{TERMS_PATH}", self.base_url)))
    }

    fn term_url(&self, id: &str) -> ApiResult<Url> {
        let mut url = self.terms_url()?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .push(id);
        Ok(url)
    }
}

#[async_trait]
impl TermApi for VocabClient {
    async fn create_term(&self, payload: &TermPayload) -> ApiResult<u16> {
        let url = self.terms_url()?;
        let resp = self
            .client
            .post(url)
            .header(ACCEPT, LD_JSON)
            .header(CONTENT_TYPE, LD_JSON)
            .json(payload)
            .send()
            .await?;
        let status = resp.status();
        tracing::debug!(status = status.as_u16(), reason = ?status.canonical_reason(), "create returned");
        Ok(status.as_u16())
    }

    async fn patch_term(&self, id: &str, payload: &TermPayload) -> ApiResult<u16> {
        let url = self.term_url(id)?;
        let resp = self
            .client
            .patch(url)
            .header(ACCEPT, LD_JSON)
            .header(CONTENT_TYPE, MERGE_PATCH_JSON)
            .json(payload)
            .send()
            .await?;
        let status = resp.status();
        tracing::debug!(term_id = id, status = status.as_u16(), reason = ?status.canonical_reason(), "patch returned");
        Ok(status.as_u16())
    }

    async fn delete_term(&self, id: &str) -> ApiResult<u16> {
        let url = self.term_url(id)?;
        let resp = self.client.delete(url).header(ACCEPT, LD_JSON).send().await?;
        let status = resp.status().as_u16();
        tracing::info!(term_id = id, status, "delete returned");
        Ok(status)
    }

    async fn list_terms(
        &self,
        label: &str,
        page: usize,
        per_page: usize,
    ) -> ApiResult<TermCollection> {
        let url = self.terms_url()?;
        let resp = self
            .client
            .get(url.clone())
            .header(ACCEPT, LD_JSON)
            .query(&[
                ("label", label.to_string()),
                ("page", page.to_string()),
                ("itemsPerPage", per_page.to_string()),
            ])
            .send()
            .await?;
        let status = resp.status();
        tracing::debug!(page, status = status.as_u16(), "list returned");
        if !status.is_success() {
            return Err(ApiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|err| ApiError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        })
    }
}

/// Pages through the listing and collects every remote term ID.
pub async fn list_all_ids<A: TermApi + ?Sized>(
    api: &A,
    label: &str,
    per_page: usize,
) -> ApiResult<Vec<String>> {
    let per_page = per_page.max(1);
    let mut ids = Vec::new();
    let mut page = 1;

    loop {
        let collection = api.list_terms(label, page, per_page).await?;
        let total = collection.total_items;
        if total == 0 {
            break;
        }
        let fetched = collection.members.len();
        ids.extend(collection.members.into_iter().map(|term| term.id));
        tracing::info!(total, collected = ids.len(), "listed remote terms");

        if fetched == 0 || ids.len() >= total || page * per_page >= total {
            break;
        }
        page += 1;
    }

    Ok(ids)
}
