use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config as Settings;
use crate::types::ClientError;

use super::api_types::{
    Config, ConfigSyncResponse, ConnectionsResponse, ErrorEntry, FolderModel, SystemInfo,
};
use super::backend::{Backend, Scheme};
use super::queries::ModelQuery;

/// HTTP implementation of [`Backend`].
pub struct RestClient {
    http: Client,
    base_urls: Vec<String>,
    current_idx: AtomicUsize,
    base_path: String,
}

impl RestClient {
    /// Prepare an HTTP client for the configured daemon. The configured URL is
    /// tried first; its other-scheme twin is kept for protocol switches.
    pub fn new(settings: &Settings) -> Result<Self, ClientError> {
        let mut base_urls = Vec::new();
        let configured = settings.api_url.trim().trim_end_matches('/');
        if !configured.is_empty() {
            push_unique_url(&mut base_urls, configured.to_string());
            for scheme in [Scheme::Https, Scheme::Http] {
                if let Some(alternate) = with_scheme(configured, scheme) {
                    push_unique_url(&mut base_urls, alternate);
                }
            }
        }
        if base_urls.is_empty() {
            base_urls.push("http://127.0.0.1:8080".to_string());
        }

        let http = Client::builder()
            .timeout(settings.request_timeout())
            .danger_accept_invalid_certs(true)
            .build()?;

        debug!(urls = ?base_urls, "Prepared REST client");
        Ok(Self {
            http,
            base_urls,
            current_idx: AtomicUsize::new(0),
            base_path: settings.base_path.trim_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        let idx = self
            .current_idx
            .load(Ordering::Relaxed)
            .min(self.base_urls.len().saturating_sub(1));
        &self.base_urls[idx]
    }

    fn url(&self, path: &str) -> String {
        let base = self.base_url().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if self.base_path.is_empty() {
            format!("{base}/{path}")
        } else {
            format!("{base}/{}/{path}", self.base_path)
        }
    }

    async fn get_json<T>(&self, path: &str) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        self.get_json_with_query(path, &()).await
    }

    async fn get_json_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self.http.get(self.url(path)).query(query).send().await?;
        let body = check_status(path, response)?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn post_empty(&self, path: &str) -> Result<(), ClientError> {
        let response = self.http.post(self.url(path)).send().await?;
        check_status(path, response)?;
        Ok(())
    }
}

#[async_trait]
impl Backend for RestClient {
    async fn version(&self) -> Result<String, ClientError> {
        let path = "/version";
        let response = self.http.get(self.url(path)).send().await?;
        let body = check_status(path, response)?.text().await?;
        Ok(parse_version_body(&body))
    }

    async fn system(&self) -> Result<SystemInfo, ClientError> {
        self.get_json("/system").await
    }

    async fn config(&self) -> Result<Config, ClientError> {
        self.get_json("/config").await
    }

    async fn config_in_sync(&self) -> Result<bool, ClientError> {
        let response: ConfigSyncResponse = self.get_json("/config/sync").await?;
        Ok(response.config_in_sync)
    }

    async fn connections(&self) -> Result<ConnectionsResponse, ClientError> {
        self.get_json("/connections").await
    }

    async fn errors(&self) -> Result<Vec<ErrorEntry>, ClientError> {
        // The daemon encodes an empty log as `null`.
        let errors: Option<Vec<ErrorEntry>> = self.get_json("/errors").await?;
        Ok(errors.unwrap_or_default())
    }

    async fn model(&self, folder_id: &str) -> Result<FolderModel, ClientError> {
        let query = ModelQuery { repo: folder_id };
        self.get_json_with_query("/model", &query).await
    }

    async fn post_config(&self, config: &Config) -> Result<(), ClientError> {
        let path = "/config";
        let response = self
            .http
            .post(self.url(path))
            .header("Content-Type", "application/json")
            .json(config)
            .send()
            .await?;
        check_status(path, response)?;
        Ok(())
    }

    async fn restart(&self) -> Result<(), ClientError> {
        self.post_empty("/restart").await
    }

    async fn shutdown(&self) -> Result<(), ClientError> {
        self.post_empty("/shutdown").await
    }

    async fn clear_errors(&self) -> Result<(), ClientError> {
        self.post_empty("/error/clear").await
    }

    fn switch_scheme(&self, scheme: Scheme) {
        let prefix = format!("{}://", scheme.as_str());
        match self.base_urls.iter().position(|url| url.starts_with(&prefix)) {
            Some(idx) => {
                self.current_idx.store(idx, Ordering::Relaxed);
                info!(url = %self.base_urls[idx], "Switched GUI protocol");
            }
            None => warn!(%scheme, "No base URL available for scheme"),
        }
    }
}

fn check_status(path: &str, response: Response) -> Result<Response, ClientError> {
    if !response.status().is_success() {
        return Err(ClientError::Status {
            path: path.to_string(),
            status: response.status(),
        });
    }
    Ok(response)
}

/// `/version` answers with bare text on older daemons and JSON on newer ones.
fn parse_version_body(body: &str) -> String {
    let trimmed = body.trim();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::String(version)) => version,
        Ok(Value::Object(map)) => map
            .get("version")
            .and_then(|v| v.as_str())
            .unwrap_or(trimmed)
            .to_string(),
        _ => trimmed.to_string(),
    }
}

fn with_scheme(url: &str, scheme: Scheme) -> Option<String> {
    let (_, rest) = url.split_once("://")?;
    Some(format!("{}://{}", scheme.as_str(), rest))
}

fn push_unique_url(list: &mut Vec<String>, candidate: String) {
    if !list.iter().any(|existing| existing == &candidate) {
        list.push(candidate);
    }
}
