//! reqwest-backed implementation of the facade traits.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::api::{NodeApi, PoolApi, StorageApi};
use crate::error::{ClientError, Result};
use crate::types::{
    CreatePoolRequest, ModifyStorageRequest, PoolInfo, PoolSummary, StorageConfig,
    StorageDescription, StorageKind, UpdatePoolRequest,
};
use crate::wire::{
    self, Envelope, NodeRecord, PoolListRecord, PoolRecord, StorageRecord, StorageResourceRecord,
};

/// Connection settings for a Proxmox VE cluster.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, e.g. `https://pve1:8006`. A trailing `/api2/json` is accepted.
    pub endpoint: String,
    /// API token id, `user@realm!name`.
    pub token_id: String,
    pub token_secret: String,
    /// Accept self-signed certificates.
    pub insecure: bool,
    /// Per-request timeout. Callers normally rely on cancellation instead.
    pub timeout: Option<Duration>,
}

/// HTTP client for the Proxmox VE REST API.
///
/// Cheap to clone; clones share the connection pool and hold no per-call state.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    authorization: String,
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let endpoint = config.endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            return Err(ClientError::InvalidConfig(
                "endpoint must not be empty".to_string(),
            ));
        }
        if config.token_id.is_empty() || config.token_secret.is_empty() {
            return Err(ClientError::InvalidConfig(
                "API token id and secret are required".to_string(),
            ));
        }

        let mut builder = reqwest::Client::builder().danger_accept_invalid_certs(config.insecure);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        let base_url = if endpoint.ends_with("/api2/json") {
            endpoint.to_string()
        } else {
            format!("{}/api2/json", endpoint)
        };

        Ok(Self {
            http,
            base_url,
            authorization: format!(
                "PVEAPIToken={}={}",
                config.token_id, config.token_secret
            ),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform a request and return the body of a successful response.
    async fn dispatch(&self, method: Method, path: &str, body: Option<Value>) -> Result<String> {
        debug!(method = %method, path = %path, "Proxmox API request");

        let mut request = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header(AUTHORIZATION, &self.authorization);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: error_message(status, &text),
            });
        }
        Ok(text)
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let text = self.dispatch(Method::GET, path, None).await?;
        let envelope: Envelope<T> = serde_json::from_str(&text)?;
        Ok(envelope.data)
    }

    async fn fetch_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        match self.fetch(path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn execute(&self, method: Method, path: &str, body: Option<Value>) -> Result<()> {
        self.dispatch(method, path, body).await.map(|_| ())
    }
}

/// Proxmox reports failures either as `{"message": ...}` or as per-parameter
/// `{"errors": {...}}`; fall back to the raw body or the status reason.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<Value>(body) {
        if let Some(message) = parsed.get("message").and_then(Value::as_str) {
            return message.trim().to_string();
        }
        if let Some(errors) = parsed.get("errors").and_then(Value::as_object) {
            let mut parts: Vec<String> = errors
                .iter()
                .map(|(param, err)| format!("{}: {}", param, err.as_str().unwrap_or_default().trim()))
                .collect();
            parts.sort();
            return parts.join("; ");
        }
    }

    let body = body.trim();
    if !body.is_empty() && !body.starts_with('{') {
        return body.to_string();
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string())
}

#[async_trait]
impl PoolApi for HttpClient {
    async fn create_pool(&self, req: CreatePoolRequest) -> Result<()> {
        let mut body = json!({ "poolid": req.id });
        if let Some(comment) = req.comment {
            body["comment"] = json!(comment);
        }
        self.execute(Method::POST, "/pools", Some(body)).await
    }

    async fn update_pool(&self, id: &str, req: UpdatePoolRequest) -> Result<()> {
        let body = wire::update_pool_body(&req);
        self.execute(Method::PUT, &format!("/pools/{}", id), Some(body))
            .await
    }

    async fn get_pool(&self, id: &str) -> Result<Option<PoolInfo>> {
        let record: Option<PoolRecord> = self.fetch_optional(&format!("/pools/{}", id)).await?;
        Ok(record.map(|r| r.into_info(id)))
    }

    async fn list_pools(&self) -> Result<Vec<PoolSummary>> {
        let records: Vec<PoolListRecord> = self.fetch("/pools").await?;
        Ok(records.into_iter().map(PoolSummary::from).collect())
    }

    async fn delete_pool(&self, id: &str) -> Result<()> {
        self.execute(Method::DELETE, &format!("/pools/{}", id), None)
            .await
    }
}

#[async_trait]
impl StorageApi for HttpClient {
    async fn create_storage(&self, config: StorageConfig) -> Result<()> {
        let body = wire::create_storage_body(&config);
        self.execute(Method::POST, "/storage", Some(body)).await
    }

    async fn get_storage(&self, kind: StorageKind, id: &str) -> Result<Option<StorageConfig>> {
        let record: Option<StorageRecord> =
            self.fetch_optional(&format!("/storage/{}", id)).await?;
        Ok(record
            .and_then(StorageRecord::into_config)
            .filter(|config| config.kind() == kind))
    }

    async fn list_storage(&self, kind: StorageKind) -> Result<Vec<StorageConfig>> {
        let records: Vec<StorageRecord> =
            self.fetch(&format!("/storage?type={}", kind)).await?;
        Ok(records
            .into_iter()
            .filter_map(StorageRecord::into_config)
            .filter(|config| config.kind() == kind)
            .collect())
    }

    async fn modify_storage(
        &self,
        kind: StorageKind,
        id: &str,
        req: ModifyStorageRequest,
    ) -> Result<()> {
        debug!(kind = %kind, id = %id, "Modifying storage");
        let body = wire::modify_storage_body(&req);
        self.execute(Method::PUT, &format!("/storage/{}", id), Some(body))
            .await
    }

    async fn delete_storage(&self, kind: StorageKind, id: &str) -> Result<()> {
        debug!(kind = %kind, id = %id, "Deleting storage");
        self.execute(Method::DELETE, &format!("/storage/{}", id), None)
            .await
    }

    async fn describe_storage(&self) -> Result<Vec<StorageDescription>> {
        let records: Vec<StorageRecord> = self.fetch("/storage").await?;
        let resources: Vec<StorageResourceRecord> =
            self.fetch("/cluster/resources?type=storage").await?;
        Ok(wire::describe(records, &resources))
    }
}

#[async_trait]
impl NodeApi for HttpClient {
    async fn list_node_names(&self) -> Result<Vec<String>> {
        let nodes: Vec<NodeRecord> = self.fetch("/nodes").await?;
        Ok(nodes.into_iter().map(|n| n.node).collect())
    }
}
