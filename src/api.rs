use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::filter::FilterQuery;
use crate::models::{PositionRecord, RecordDto};

/// Client for the record-persistence backend. JSON bodies, bearer token in
/// the Authorization header; the token is opaque here.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    success: bool,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Spreadsheet import behavior for rows that already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    Preview,
    Add,
    Replace,
    Skip,
}

impl ImportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportMode::Preview => "preview",
            ImportMode::Add => "add",
            ImportMode::Replace => "replace",
            ImportMode::Skip => "skip",
        }
    }

    pub fn parse(s: &str) -> Option<ImportMode> {
        match s {
            "preview" => Some(ImportMode::Preview),
            "add" => Some(ImportMode::Add),
            "replace" => Some(ImportMode::Replace),
            "skip" => Some(ImportMode::Skip),
            _ => None,
        }
    }
}

/// Whatever the import endpoint reports beyond success/message (row counts,
/// previewed records) is passed through untyped for display.
#[derive(Debug, Deserialize)]
pub struct ImportOutcome {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl ApiClient {
    pub fn new(base_url: String, token: Option<String>) -> Self {
        ApiClient {
            base_url,
            token,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| anyhow!("Not logged in. Run 'pursuit login' first."))?;
        Ok(builder.bearer_auth(token))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&LoginRequest { username, password })
            .send()
            .await
            .context("Failed to reach the backend for login")?;

        let body: LoginResponse = response
            .json()
            .await
            .context("Failed to parse login response")?;
        if !body.success {
            return Err(anyhow!(
                "Login failed: {}",
                body.message.unwrap_or_else(|| "unknown error".to_string())
            ));
        }
        body.token
            .ok_or_else(|| anyhow!("Login succeeded but no token was returned"))
    }

    pub async fn list_records(&self) -> Result<Vec<PositionRecord>> {
        let request = self.authorized(self.client.get(self.url("/records")))?;
        let records: Vec<RecordDto> = self.expect_data(request, "list records").await?;
        Ok(records.into_iter().map(RecordDto::into_normalized).collect())
    }

    /// Server-side variant of the local filter; functionally equivalent.
    pub async fn search_records(&self, query: &FilterQuery) -> Result<Vec<PositionRecord>> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(keywords) = &query.keywords {
            params.push(("keywords", keywords.clone()));
        }
        if let Some(final_result) = &query.final_result {
            params.push(("finalResult", final_result.clone()));
        }
        if let Some(status) = &query.current_status {
            params.push(("currentStatus", status.clone()));
        }
        if let Some(min) = query.min_salary {
            params.push(("minSalary", min.to_string()));
        }
        let request =
            self.authorized(self.client.get(self.url("/records/search")).query(&params))?;
        let records: Vec<RecordDto> = self.expect_data(request, "search records").await?;
        Ok(records.into_iter().map(RecordDto::into_normalized).collect())
    }

    /// Create one record. The server assigns the id (and a group id when the
    /// record does not name one) and echoes the stored record back.
    pub async fn create_record(&self, record: &PositionRecord) -> Result<Option<PositionRecord>> {
        let request = self.authorized(self.client.post(self.url("/records")).json(record))?;
        let created: Option<RecordDto> = self.maybe_data(request, "create record").await?;
        Ok(created.map(RecordDto::into_normalized))
    }

    /// Bulk create several positions at one company; the server assigns one
    /// shared company group id to the whole batch.
    pub async fn create_batch(&self, records: &[PositionRecord]) -> Result<()> {
        let request = self
            .authorized(self.client.post(self.url("/records/batch")).json(records))?;
        self.expect_ok(request, "batch create records").await
    }

    /// Full-record replace.
    pub async fn update_record(&self, record: &PositionRecord) -> Result<()> {
        let id = record.id.ok_or_else(|| anyhow!("record has no id yet"))?;
        let request = self.authorized(
            self.client
                .put(self.url(&format!("/records/{id}")))
                .json(record),
        )?;
        self.expect_ok(request, "update record").await
    }

    pub async fn delete_record(&self, id: i64) -> Result<()> {
        let request = self.authorized(self.client.delete(self.url(&format!("/records/{id}"))))?;
        self.expect_ok(request, "delete record").await
    }

    /// Persist every record of one company group, one PUT per sibling issued
    /// concurrently, joining on the full set before reporting. The group's
    /// derived ordering assumes all siblings reflect a consistent state, so
    /// any single failure makes the whole save a failure even though the
    /// sibling updates that did land are not rolled back. No retry.
    pub async fn save_group(&self, records: &[PositionRecord]) -> Result<()> {
        let mut handles = Vec::with_capacity(records.len());
        for record in records {
            let client = self.clone();
            let record = record.clone();
            handles.push(tokio::spawn(async move {
                let id = record.id;
                (id, client.update_record(&record).await)
            }));
        }

        let mut first_error: Option<anyhow::Error> = None;
        let mut failed = 0usize;
        for handle in handles {
            let (id, outcome) = handle.await.context("group save task panicked")?;
            if let Err(e) = outcome {
                warn!(record_id = ?id, error = %e, "group member update failed");
                failed += 1;
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            None => Ok(()),
            Some(e) => Err(e.context(format!(
                "{failed} of {} group updates failed; records already updated were not rolled back",
                records.len()
            ))),
        }
    }

    /// Stream the exported spreadsheet to `output`. With a non-empty filter
    /// the filtered export endpoint is used instead. Returns the byte count.
    pub async fn export(&self, query: Option<&FilterQuery>, output: &Path) -> Result<u64> {
        let request = match query {
            Some(q) if !q.is_empty() => {
                let mut params: Vec<(&str, String)> = Vec::new();
                if let Some(keywords) = &q.keywords {
                    params.push(("keywords", keywords.clone()));
                }
                if let Some(final_result) = &q.final_result {
                    params.push(("finalResult", final_result.clone()));
                }
                if let Some(status) = &q.current_status {
                    params.push(("currentStatus", status.clone()));
                }
                if let Some(min) = q.min_salary {
                    params.push(("minSalary", min.to_string()));
                }
                self.client
                    .get(self.url("/records/export/search"))
                    .query(&params)
            }
            _ => self.client.get(self.url("/records/export")),
        };

        let response = self
            .authorized(request)?
            .send()
            .await
            .context("Failed to request export")?;
        if !response.status().is_success() {
            return Err(anyhow!("Export failed with status {}", response.status()));
        }
        let bytes = response
            .bytes()
            .await
            .context("Failed to download export stream")?;
        std::fs::write(output, &bytes)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        Ok(bytes.len() as u64)
    }

    /// Upload a spreadsheet for import. The sheet encoding itself is the
    /// server's business; we only ship the bytes.
    pub async fn import(&self, file: &Path, mode: ImportMode) -> Result<ImportOutcome> {
        let bytes = std::fs::read(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("import.xlsx")
            .to_string();
        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            )
            .text("mode", mode.as_str());

        let response = self
            .authorized(self.client.post(self.url("/records/import")))?
            .multipart(form)
            .send()
            .await
            .context("Failed to upload import file")?;

        let outcome: ImportOutcome = response
            .json()
            .await
            .context("Failed to parse import response")?;
        Ok(outcome)
    }

    async fn send_envelope<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        action: &str,
    ) -> Result<Envelope<T>> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to {action}"))?;
        let status = response.status();
        debug!(%status, action, "backend response");
        let envelope: Envelope<T> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse response while trying to {action}"))?;
        if !envelope.success {
            return Err(anyhow!(
                "Failed to {action}: {}",
                envelope
                    .message
                    .unwrap_or_else(|| format!("server returned {status}"))
            ));
        }
        Ok(envelope)
    }

    async fn expect_data<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        action: &str,
    ) -> Result<T> {
        let envelope = self.send_envelope(request, action).await?;
        envelope
            .data
            .ok_or_else(|| anyhow!("Response for {action} carried no data"))
    }

    async fn maybe_data<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        action: &str,
    ) -> Result<Option<T>> {
        let envelope = self.send_envelope(request, action).await?;
        Ok(envelope.data)
    }

    async fn expect_ok(&self, request: reqwest::RequestBuilder, action: &str) -> Result<()> {
        self.send_envelope::<serde_json::Value>(request, action)
            .await
            .map(|_| ())
    }
}
