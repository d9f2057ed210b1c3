use crate::error::SourceError;
use reqwest::Client as HttpClient;
use std::time::Duration;

const USER_AGENT: &str = "madrid-district-data/0.1";

/// Thin wrapper over `reqwest` shared by every remote source.
pub struct Client {
    http_client: HttpClient,
}

impl Client {
    pub fn new(timeout_sec: u64) -> Result<Self, SourceError> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { http_client })
    }

    pub async fn get(&self, url: &str) -> Result<String, SourceError> {
        self.get_with(url, &[], &[]).await
    }

    pub async fn get_with(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        query: &[(&str, String)],
    ) -> Result<String, SourceError> {
        let response = self.send(url, headers, query).await?;
        Ok(response.text().await?)
    }

    pub async fn get_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, SourceError> {
        let body = self.get_with(url, headers, query).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        let response = self.send(url, &[], &[]).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn send(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, SourceError> {
        let mut request = self.http_client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request.send().await?;

        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(SourceError::status(status, body))
        }
    }
}
