use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::types::*;
use super::LinkProvisioner;

/// HTTP client for the interconnect link API
pub struct InterconnectClient {
    base_url: String,
    token: String,
    client: Client,
}

impl InterconnectClient {
    pub fn new(url: &str, token: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &str, body: &ProvisionRequest) -> Result<ProvisionResponse> {
        let mut req = self
            .client
            .post(self.api_url(path))
            .header("Accept", "application/json")
            .json(body);
        if !self.token.is_empty() {
            req = req.bearer_auth(&self.token);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("Interconnect API request to {} failed", path))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Interconnect API error {}: {}", status, body));
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl LinkProvisioner for InterconnectClient {
    async fn create_link(&self, req: &ProvisionRequest) -> Result<ProvisionResponse> {
        self.post("/create_link", req).await
    }

    async fn clear_link(&self, req: &ProvisionRequest) -> Result<ProvisionResponse> {
        self.post("/clear_link", req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_trims_trailing_slash() {
        let client = InterconnectClient::new("http://ic-api:4000/", "", 5).unwrap();
        assert_eq!(client.api_url("/create_link"), "http://ic-api:4000/create_link");
    }
}
