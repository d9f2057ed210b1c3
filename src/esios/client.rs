use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::{ParseError, SourceError};
use crate::http::Client;
use crate::rate_limit::RateLimiter;

/// Entry of the `/indicators` catalogue.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IndicatorSummary {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IndicatorValue {
    #[serde(default)]
    pub datetime: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub geo_id: Option<i64>,
    #[serde(default)]
    pub geo_name: Option<String>,
    #[serde(default)]
    pub geo_agg: Option<String>,
}

/// One indicator with its latest values.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Indicator {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub values: Vec<IndicatorValue>,
}

#[derive(Deserialize)]
struct IndicatorList {
    indicators: Vec<IndicatorSummary>,
}

#[derive(Deserialize)]
struct IndicatorEnvelope {
    indicator: Indicator,
}

/// Client for the REE e·sios API.
///
/// Every request carries the `x-api-key` header and goes through a shared
/// [`RateLimiter`].
pub struct EsiosClient {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
    limiter: RateLimiter,
}

impl EsiosClient {
    pub fn new(
        client: Arc<Client>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            limiter,
        }
    }

    async fn request(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value, SourceError> {
        self.limiter.acquire().await;
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint);
        let headers = [
            ("x-api-key", self.api_key.as_str()),
            ("Accept", "application/json"),
            ("Content-Type", "application/json"),
        ];
        tracing::debug!(%url, "ESIOS request");
        self.client.get_json(&url, &headers, query).await
    }

    pub async fn indicators(&self) -> Result<Vec<IndicatorSummary>, SourceError> {
        let value = self.request("indicators", &[]).await?;
        let list: IndicatorList = serde_json::from_value(value)?;
        Ok(list.indicators)
    }

    pub async fn indicator(&self, id: u32) -> Result<Indicator, SourceError> {
        let value = self.request(&format!("indicators/{}", id), &[]).await?;
        parse_indicator(value, id)
    }

    /// Values of `id` between two `YYYY-MM-DD` dates.
    pub async fn indicator_data(&self, id: u32, start: &str, end: &str) -> Result<Indicator, SourceError> {
        let query = [("start_date", start.to_string()), ("end_date", end.to_string())];
        let value = self.request(&format!("indicators/{}/data", id), &query).await?;
        parse_indicator(value, id)
    }

    /// Catalogue entries whose name or description contains `term`,
    /// ignoring case.
    pub async fn indicators_by_type(&self, term: &str) -> Result<Vec<IndicatorSummary>, SourceError> {
        let term = term.to_lowercase();
        Ok(self
            .indicators()
            .await?
            .into_iter()
            .filter(|i| i.name.to_lowercase().contains(&term) || i.description.to_lowercase().contains(&term))
            .collect())
    }

    pub async fn test_connection(&self) -> bool {
        match self.indicators().await {
            Ok(list) => {
                tracing::info!(indicators = list.len(), "Connected to ESIOS");
                true
            }
            Err(e) => {
                tracing::error!("ESIOS connection failed: {}", e);
                false
            }
        }
    }
}

fn parse_indicator(value: Value, id: u32) -> Result<Indicator, SourceError> {
    if value.get("indicator").is_none() {
        return Err(ParseError::UnexpectedStructure(format!("indicator {} missing from response", id)).into());
    }
    let mut indicator = serde_json::from_value::<IndicatorEnvelope>(value)?.indicator;
    indicator.id = id;
    Ok(indicator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> EsiosClient {
        EsiosClient::new(
            Arc::new(Client::new(5).unwrap()),
            server.uri(),
            "test-key",
            RateLimiter::new("esios", Duration::ZERO),
        )
    }

    mod succeeds {
        use super::*;

        #[tokio::test]
        async fn test_indicators_sends_api_key() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/indicators"))
                .and(header("x-api-key", "test-key"))
                .respond_with(ResponseTemplate::new(200).set_body_string(fixtures::ESIOS_INDICATORS_JSON))
                .expect(1)
                .mount(&server)
                .await;

            let list = client_for(&server).indicators().await.unwrap();

            assert_eq!(list.len(), 3);
            assert_eq!(list[0].id, 1293);
        }

        #[tokio::test]
        async fn test_indicators_by_type_ignores_case() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/indicators"))
                .respond_with(ResponseTemplate::new(200).set_body_string(fixtures::ESIOS_INDICATORS_JSON))
                .mount(&server)
                .await;

            let found = client_for(&server).indicators_by_type("DEMANDA").await.unwrap();

            let ids: Vec<u32> = found.iter().map(|i| i.id).collect();
            assert_eq!(ids, vec![1293, 573]);
        }

        #[tokio::test]
        async fn test_indicator_values() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/indicators/1293"))
                .respond_with(ResponseTemplate::new(200).set_body_string(fixtures::ESIOS_INDICATOR_JSON))
                .mount(&server)
                .await;

            let indicator = client_for(&server).indicator(1293).await.unwrap();

            assert_eq!(indicator.id, 1293);
            assert_eq!(indicator.name, "Demanda real");
            assert_eq!(indicator.unit, "MW");
            assert_eq!(indicator.values.len(), 2);
            assert_eq!(indicator.values[0].value, Some(28150.5));
            assert_eq!(indicator.values[1].geo_name.as_deref(), Some("Península"));
        }

        #[tokio::test]
        async fn test_indicator_data_range() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/indicators/1293/data"))
                .and(query_param("start_date", "2024-03-01"))
                .and(query_param("end_date", "2024-03-02"))
                .respond_with(ResponseTemplate::new(200).set_body_string(fixtures::ESIOS_INDICATOR_JSON))
                .expect(1)
                .mount(&server)
                .await;

            let indicator = client_for(&server)
                .indicator_data(1293, "2024-03-01", "2024-03-02")
                .await
                .unwrap();

            assert_eq!(indicator.values.len(), 2);
        }

        #[tokio::test]
        async fn test_connection_ok() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/indicators"))
                .respond_with(ResponseTemplate::new(200).set_body_string(fixtures::ESIOS_INDICATORS_JSON))
                .mount(&server)
                .await;

            assert!(client_for(&server).test_connection().await);
        }
    }

    mod fails {
        use super::*;

        #[tokio::test]
        async fn test_connection_rejected_key() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/indicators"))
                .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
                .mount(&server)
                .await;

            assert!(!client_for(&server).test_connection().await);
        }

        #[tokio::test]
        async fn test_indicator_without_envelope() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/indicators/9"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": "x"})))
                .mount(&server)
                .await;

            let err = client_for(&server).indicator(9).await.unwrap_err();

            assert!(matches!(err, SourceError::Parse(ParseError::UnexpectedStructure(_))));
        }
    }
}
