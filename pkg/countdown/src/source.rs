use async_trait::async_trait;
use pkg_constants::api::BULK_COUNTDOWN_PATH;
use pkg_types::lease::{AuthoritativeRecord, BulkCountdownRequest, LeaseId};
use std::time::Duration;

use crate::fetcher::LeaseSource;

/// `LeaseSource` backed by the authoritative server's bulk countdown endpoint.
///
/// `POST {server}/api/v1/leases/countdowns` with `{"leaseIds": [...]}`,
/// answered by a JSON array of authoritative records.
#[derive(Clone)]
pub struct HttpLeaseSource {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpLeaseSource {
    pub fn new(server: &str, token: Option<String>) -> anyhow::Result<Self> {
        Self::with_timeout(server, token, None)
    }

    /// Like `new`, with a per-request timeout enforced by the transport.
    pub fn with_timeout(
        server: &str,
        token: Option<String>,
        timeout: Option<Duration>,
    ) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;
        Ok(Self::with_client(client, server, token))
    }

    pub fn with_client(client: reqwest::Client, server: &str, token: Option<String>) -> Self {
        Self {
            client,
            url: format!("{}{}", server.trim_end_matches('/'), BULK_COUNTDOWN_PATH),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl LeaseSource for HttpLeaseSource {
    async fn fetch_chunk(&self, ids: &[LeaseId]) -> anyhow::Result<Vec<AuthoritativeRecord>> {
        let body = BulkCountdownRequest {
            lease_ids: ids.to_vec(),
        };
        let mut req = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Request to {} failed: {}", self.url, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Server returned {}: {}", status, body);
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read response body: {}", e))?;
        let records: Vec<AuthoritativeRecord> = serde_json::from_slice(&bytes)
            .map_err(|e| anyhow::anyhow!("Malformed countdown response: {}", e))?;
        Ok(records)
    }
}
