use std::path::Path;

use async_trait::async_trait;
use mailimport_domain::{ImportEntry, ImportId, ImportPort, ImportTarget, ProcessId};
use mailimport_error::PipelineError;
use reqwest::{multipart, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub url: String,
    pub access_key: String,
    pub secret_key: String,
}

pub struct ImportClient {
    base_url: String,
    auth: String,
    http: reqwest::Client,
}

impl ImportClient {
    pub fn new(cfg: RemoteConfig) -> Self {
        let base_url = format!("https://{}", normalize_host(&cfg.url));
        let auth = format!("Bearer {}:{}", cfg.access_key, cfg.secret_key);
        Self {
            base_url,
            auth,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Strips a leading `http://`/`https://` and any trailing `/`.
pub fn normalize_host(url: &str) -> String {
    let url = url.trim();
    let host = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    host.trim_end_matches('/').to_string()
}

#[derive(Deserialize)]
struct CatalogEntry {
    id: Value,
    name: String,
}

fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Non-2xx responses become `Api` errors carrying the raw body as detail.
fn check_status(status: StatusCode, body: String, failure: &str) -> Result<String, PipelineError> {
    if status.is_success() {
        Ok(body)
    } else {
        Err(PipelineError::api(format!("{failure} ({status})"), body))
    }
}

fn parse_catalog(body: &str) -> Result<Vec<ImportEntry>, PipelineError> {
    let entries: Vec<CatalogEntry> = serde_json::from_str(body)
        .map_err(|e| PipelineError::api(format!("failed to parse import list: {e}"), body))?;

    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            let id = id_string(&entry.id)?;
            Some(ImportEntry {
                id: ImportId(id),
                name: entry.name,
            })
        })
        .collect())
}

fn parse_process_id(body: &str) -> Result<ProcessId, PipelineError> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| PipelineError::api(format!("failed to parse import run response: {e}"), body))?;

    json.get("processId")
        .and_then(id_string)
        .map(ProcessId)
        .ok_or_else(|| PipelineError::api("import run response has no processId", body))
}

#[async_trait]
impl ImportPort for ImportClient {
    async fn list_imports(&self) -> Result<Vec<ImportEntry>, PipelineError> {
        let url = self.url("/api/v3/imports");
        debug!(url = %url, "GET imports");

        let resp = self
            .http
            .get(&url)
            .header("Authorization", &self.auth)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| PipelineError::network(format!("import list request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| PipelineError::network(format!("import list read body: {e}")))?;

        let body = check_status(status, body, "failed to get import")?;
        parse_catalog(&body)
    }

    async fn run_import(
        &self,
        target: &ImportTarget,
        file: &Path,
        action: &str,
        comment: Option<&str>,
    ) -> Result<ProcessId, PipelineError> {
        let url = self.url(&format!("/api/v3/imports/{}/run", target.id));
        debug!(url = %url, file = %file.display(), action, "POST import run");

        let file_bytes = tokio::fs::read(file)
            .await
            .map_err(|e| PipelineError::io(format!("read {}: {e}", file.display())))?;

        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("import.csv")
            .to_string();

        let file_part = multipart::Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str("text/csv")
            .map_err(|e| PipelineError::internal(format!("invalid mime type: {e}")))?;
        let form = multipart::Form::new().part("file", file_part);

        let mut query = vec![("action", action)];
        if let Some(c) = comment {
            query.push(("comments", c));
        }

        let resp = self
            .http
            .post(&url)
            .header("Authorization", &self.auth)
            .header("Accept", "application/json")
            .query(&query)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PipelineError::network(format!("import run request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| PipelineError::network(format!("import run read body: {e}")))?;

        let body = check_status(status, body, "failed to start import")?;
        parse_process_id(&body)
    }
}
