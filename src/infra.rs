use crate::config::AppConfig;
use crate::domain::{ContentGroup, ContentNode, StoreSummary, SyncOutcome};
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Catalog provider and synchronization sink. Calls block; the worker runs
/// them on the blocking pool.
pub trait CatalogBackend: Send + Sync {
    fn list_stores(&self) -> Result<Vec<StoreSummary>>;
    fn fetch_catalog(&self, store: &str) -> Result<Vec<ContentGroup>>;
    fn fetch_current_selection(&self, store: &str) -> Result<Vec<String>>;
    fn submit(&self, store: &str, page_ids: &[String]) -> Result<SyncOutcome>;
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("backend rejected the request: {message}")]
    Rejected { message: String },
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct HttpCatalogBackend {
    client: Client,
    base_url: String,
    user_id: String,
}

impl HttpCatalogBackend {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_id: config.user_id.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get_text(&self, url: &str) -> Result<String, CatalogError> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|source| CatalogError::Transport {
                url: url.to_string(),
                source,
            })?;
        read_body(url, response)
    }
}

fn read_body(url: &str, response: reqwest::blocking::Response) -> Result<String, CatalogError> {
    let status = response.status();
    if !status.is_success() {
        return Err(CatalogError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    response.text().map_err(|source| CatalogError::Transport {
        url: url.to_string(),
        source,
    })
}

#[derive(Debug, Serialize)]
struct SyncRequest<'a> {
    user_id: &'a str,
    vector_store_id: &'a str,
    page_ids: &'a [String],
}

impl CatalogBackend for HttpCatalogBackend {
    fn list_stores(&self) -> Result<Vec<StoreSummary>> {
        let url = self.url("/v1/vector-stores");
        let body = self.get_text(&url)?;
        Ok(parse_stores_response(&body)?)
    }

    fn fetch_catalog(&self, store: &str) -> Result<Vec<ContentGroup>> {
        let url = self.url("/v1/confluence/catalog");
        let body = self.get_text(&url)?;
        let groups = parse_catalog_response(&body)?;
        info!(store, groups = groups.len(), "catalog fetched");
        Ok(groups)
    }

    fn fetch_current_selection(&self, store: &str) -> Result<Vec<String>> {
        let url = self.url(&format!("/v1/vectorstore/{store}/pages"));
        let body = self.get_text(&url)?;
        let ids = parse_selection_response(&body)?;
        info!(store, pages = ids.len(), "current selection fetched");
        Ok(ids)
    }

    fn submit(&self, store: &str, page_ids: &[String]) -> Result<SyncOutcome> {
        let url = self.url("/v1/pages/sync-now");
        let request = SyncRequest {
            user_id: &self.user_id,
            vector_store_id: store,
            page_ids,
        };
        info!(store, pages = page_ids.len(), "submitting sync");
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|source| CatalogError::Transport {
                url: url.clone(),
                source,
            })?;
        let body = read_body(&url, response)?;
        let outcome = parse_sync_response(&body)?;
        if !outcome.success {
            warn!(store, message = ?outcome.message, "sync rejected");
        }
        Ok(outcome)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    message: Option<String>,
}

impl Envelope {
    fn parse(body: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(body)?)
    }

    fn is_success(&self) -> bool {
        self.status == "success"
    }

    fn into_data(self) -> Result<Value, CatalogError> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(CatalogError::Rejected {
                message: self
                    .message
                    .unwrap_or_else(|| format!("status={}", self.status)),
            })
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireGroup {
    #[serde(deserialize_with = "id_string")]
    id: String,
    name: String,
    #[serde(default)]
    key: String,
    #[serde(default)]
    pages: Vec<WirePage>,
}

#[derive(Debug, Deserialize)]
struct WirePage {
    #[serde(deserialize_with = "id_string")]
    id: String,
    title: String,
    #[serde(rename = "parentId", default, deserialize_with = "optional_id_string")]
    parent_id: Option<String>,
    #[serde(default)]
    children: Vec<WirePage>,
}

impl From<WireGroup> for ContentGroup {
    fn from(group: WireGroup) -> Self {
        ContentGroup {
            id: group.id,
            name: group.name,
            key: group.key,
            pages: group.pages.into_iter().map(ContentNode::from).collect(),
        }
    }
}

impl From<WirePage> for ContentNode {
    fn from(page: WirePage) -> Self {
        ContentNode {
            id: page.id,
            title: page.title,
            parent_id: page.parent_id,
            children: page.children.into_iter().map(ContentNode::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireStore {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdValue {
    Text(String),
    Number(i64),
}

impl From<IdValue> for String {
    fn from(value: IdValue) -> Self {
        match value {
            IdValue::Text(text) => text,
            IdValue::Number(number) => number.to_string(),
        }
    }
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    IdValue::deserialize(deserializer).map(String::from)
}

fn optional_id_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<IdValue>::deserialize(deserializer)?.map(String::from))
}

pub fn parse_catalog_response(body: &str) -> Result<Vec<ContentGroup>, CatalogError> {
    let data = Envelope::parse(body)?.into_data()?;
    let groups: Vec<WireGroup> = serde_json::from_value(data)?;
    Ok(groups.into_iter().map(ContentGroup::from).collect())
}

pub fn parse_selection_response(body: &str) -> Result<Vec<String>, CatalogError> {
    let data = Envelope::parse(body)?.into_data()?;
    let ids: Vec<IdValue> = serde_json::from_value(data)?;
    Ok(ids.into_iter().map(String::from).collect())
}

pub fn parse_stores_response(body: &str) -> Result<Vec<StoreSummary>, CatalogError> {
    let data = Envelope::parse(body)?.into_data()?;
    let stores: Vec<WireStore> = serde_json::from_value(data)?;
    Ok(stores
        .into_iter()
        .map(|store| StoreSummary {
            name: store.name.unwrap_or_else(|| store.id.clone()),
            id: store.id,
            status: store.status,
        })
        .collect())
}

pub fn parse_sync_response(body: &str) -> Result<SyncOutcome, CatalogError> {
    let envelope = Envelope::parse(body)?;
    Ok(SyncOutcome {
        success: envelope.is_success(),
        message: envelope.message,
    })
}
