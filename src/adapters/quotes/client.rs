//! Quote HTTP Client - Shared reqwest Wrapper for Aggregator APIs
//!
//! Wraps reqwest with a request timeout, optional outbound proxy and
//! uniform error mapping. Anything short of a decodable 2xx body becomes
//! `QuoteUnavailable`; the pipeline never retries within a cycle, so there
//! is no retry loop here either.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Proxy};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::domain::error::PriceError;

/// Longest upstream error body kept in an error message.
const MAX_ERROR_BODY: usize = 256;

/// Configuration for the quote HTTP client.
#[derive(Debug, Clone)]
pub struct QuoteClientConfig {
  /// Request timeout.
  pub timeout: Duration,
  /// Optional proxy URL applied to all requests.
  pub proxy: Option<String>,
}

impl Default for QuoteClientConfig {
  fn default() -> Self {
    Self {
      timeout: Duration::from_secs(30),
      proxy: None,
    }
  }
}

/// JSON-over-HTTP client for one aggregator adapter.
pub struct QuoteHttpClient {
  /// Underlying HTTP client.
  http: Client,
  /// Adapter name used in error values.
  adapter: &'static str,
}

impl QuoteHttpClient {
  /// Create a new client for `adapter`.
  ///
  /// # Errors
  /// Fails if the proxy URL is invalid or the TLS backend cannot start.
  pub fn new(adapter: &'static str, config: &QuoteClientConfig) -> Result<Self> {
    let mut builder = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(2);

    // Proxying is decided by configuration only, not by reqwest's env lookup.
    builder = match &config.proxy {
      Some(proxy) => builder.proxy(
        Proxy::all(proxy).with_context(|| format!("Invalid HTTP proxy for {adapter}"))?,
      ),
      None => builder.no_proxy(),
    };

    let http = builder.build().context("Failed to build HTTP client")?;
    Ok(Self { http, adapter })
  }

  /// GET `url` with `query` and optional extra headers, decoding a JSON body.
  ///
  /// # Errors
  /// `QuoteUnavailable` on transport errors, timeouts, non-2xx statuses
  /// and bodies that do not decode into `T`.
  pub async fn get_json<T: DeserializeOwned>(
    &self,
    url: &str,
    query: &[(&str, String)],
    headers: &[(&'static str, String)],
  ) -> Result<T, PriceError> {
    let mut request = self.http.get(url).query(query);
    for (name, value) in headers {
      request = request.header(*name, value);
    }

    let response = request.send().await.map_err(|e| {
      warn!(adapter = self.adapter, error = %e, "Quote request failed");
      PriceError::quote(self.adapter, describe_transport_error(&e))
    })?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      let body: String = body.chars().take(MAX_ERROR_BODY).collect();
      warn!(adapter = self.adapter, status = %status, body = %body, "Quote API error");
      return Err(PriceError::quote(self.adapter, format!("HTTP {status}: {body}")));
    }

    let decoded = response
      .json::<T>()
      .await
      .map_err(|e| PriceError::quote(self.adapter, format!("undecodable response: {e}")))?;

    debug!(adapter = self.adapter, url, "Quote response decoded");
    Ok(decoded)
  }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
  if e.is_timeout() {
    format!("request timed out: {e}")
  } else if e.is_connect() {
    format!("connection failed: {e}")
  } else {
    e.to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_rejects_invalid_proxy() {
    let config = QuoteClientConfig {
      proxy: Some("::not a proxy::".to_string()),
      ..QuoteClientConfig::default()
    };
    assert!(QuoteHttpClient::new("test", &config).is_err());
  }

  #[test]
  fn test_builds_with_proxy() {
    let config = QuoteClientConfig {
      proxy: Some("http://127.0.0.1:3128".to_string()),
      ..QuoteClientConfig::default()
    };
    assert!(QuoteHttpClient::new("test", &config).is_ok());
  }

  #[tokio::test]
  async fn test_unreachable_host_is_quote_unavailable() {
    let config = QuoteClientConfig {
      timeout: Duration::from_secs(2),
      proxy: None,
    };
    let client = QuoteHttpClient::new("test", &config).unwrap();
    // Port 9 (discard) on localhost is closed in test environments.
    let err = client
      .get_json::<serde_json::Value>("http://127.0.0.1:9/quote", &[], &[])
      .await
      .unwrap_err();
    assert!(matches!(err, PriceError::QuoteUnavailable { adapter: "test", .. }));
  }
}
