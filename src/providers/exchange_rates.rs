use super::util::{build_client, get_json};
use crate::core::source::{RateSource, RateTable};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Latest rates from an open.er-api.com compatible endpoint.
pub struct ExchangeRateProvider {
    base_url: String,
    base_currency: String,
    client: reqwest::Client,
}

impl ExchangeRateProvider {
    pub fn new(base_url: &str, base_currency: &str, timeout: Duration) -> Result<Self> {
        Ok(ExchangeRateProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            base_currency: base_currency.to_uppercase(),
            client: build_client(timeout)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    rates: Option<RateTable>,
}

#[async_trait]
impl RateSource for ExchangeRateProvider {
    #[instrument(
        name = "RatesFetch",
        skip(self),
        fields(base_url = %self.base_url, base = %self.base_currency)
    )]
    async fn fetch_rates(&self) -> Result<RateTable> {
        let url = format!("{}/v6/latest/{}", self.base_url, self.base_currency);
        let data: LatestRatesResponse = get_json(&self.client, &url, "exchange rates API").await?;

        let rates = data
            .rates
            .ok_or_else(|| anyhow!("Invalid rates data: response has no rates"))?;
        debug!(count = rates.len(), "Received exchange rates");
        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(base: &str, status: u16, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/v6/latest/{base}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(status).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_fetch_rates() {
        let mock_response = r#"{
            "result": "success",
            "base_code": "USD",
            "rates": {"USD": 1, "NGN": 1600.23, "EUR": 0.92}
        }"#;
        let mock_server = create_mock_server("USD", 200, mock_response).await;
        let provider =
            ExchangeRateProvider::new(&mock_server.uri(), "usd", Duration::from_secs(5)).unwrap();

        let rates = provider.fetch_rates().await.unwrap();
        assert_eq!(rates.len(), 3);
        assert_eq!(rates["USD"], 1.0);
        assert_eq!(rates["NGN"], 1600.23);
        assert_eq!(rates["EUR"], 0.92);
    }

    #[tokio::test]
    async fn test_missing_rates_key() {
        let mock_response = r#"{"result": "error", "error-type": "unsupported-code"}"#;
        let mock_server = create_mock_server("USD", 200, mock_response).await;
        let provider =
            ExchangeRateProvider::new(&mock_server.uri(), "USD", Duration::from_secs(5)).unwrap();

        let result = provider.fetch_rates().await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "Invalid rates data: response has no rates"
        );
    }

    #[tokio::test]
    async fn test_rates_api_error_response() {
        let mock_server = create_mock_server("USD", 503, "").await;
        let provider =
            ExchangeRateProvider::new(&mock_server.uri(), "USD", Duration::from_secs(5)).unwrap();

        let result = provider.fetch_rates().await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 503 Service Unavailable from exchange rates API"
        );
    }

    #[tokio::test]
    async fn test_rates_api_malformed_response() {
        let mock_response = r#"{"rates": {"USD": "one"}}"#;
        let mock_server = create_mock_server("USD", 200, mock_response).await;
        let provider =
            ExchangeRateProvider::new(&mock_server.uri(), "USD", Duration::from_secs(5)).unwrap();

        let result = provider.fetch_rates().await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response from exchange rates API")
        );
    }
}
