use anyhow::{Context, Result, anyhow};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error};

/// Builds the HTTP client shared by the upstream providers. Every request made
/// with it is bounded by `timeout`; there are no retries.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("cgdp/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Issues a single GET and decodes the JSON body. Transport errors, timeouts,
/// non-success statuses and undecodable bodies all surface as errors naming `source`.
pub async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    source: &str,
) -> Result<T> {
    debug!("Requesting {} data from {}", source, url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| anyhow!("Request error: {} for {} URL: {}", e, source, url))?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "HTTP error: {} from {}",
            response.status(),
            source
        ));
    }

    let text = response
        .text()
        .await
        .with_context(|| format!("Failed to get response text from {source}"))?;

    match serde_json::from_str(&text) {
        Ok(data) => Ok(data),
        Err(e) => {
            error!(
                error = ?e,
                response = %truncate(&text, 512),
                "Failed to parse {} response", source
            );
            Err(anyhow!("Failed to parse JSON response from {}: {}", source, e))
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
