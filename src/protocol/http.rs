// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP transport for the MyQ cloud API.

use std::time::Duration;

use reqwest::Client;

use crate::error::{ApiError, Error, ParseError, ProtocolError};

use super::ApiRequest;

/// Application id constant the vendor hands to its mobile clients.
const MYQ_APPLICATION_ID: &str =
    "NWknvuBd7LoFHfXmKNMBcgajXtZEgKUh4V7WNzMidrpUUluDpVYVZx+xT4PCM5Kx";

/// Client-identity string the API expects on every request.
const USER_AGENT: &str = "Chamberlain/3.61.1 (iPhone; iOS 10.0.1; Scale/2.00)";

/// API version header value.
const API_VERSION: &str = "4.1";

/// Brand id header value.
const BRAND_ID: &str = "2";

/// Locale header value.
const CULTURE: &str = "en";

// ============================================================================
// ApiConfig - Configuration for the MyQ cloud endpoint
// ============================================================================

/// Configuration for the MyQ cloud endpoint.
///
/// Holds connection parameters for the [`Transport`]. The defaults point at
/// the production cloud host; tests override the base URL to target a mock
/// server.
///
/// # Examples
///
/// ```
/// use myq_lib::protocol::ApiConfig;
/// use std::time::Duration;
///
/// // Production endpoint with defaults
/// let config = ApiConfig::new();
///
/// // Custom endpoint and timeout
/// let config = ApiConfig::new()
///     .with_base_url("http://127.0.0.1:8080")
///     .with_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct ApiConfig {
    base_url: String,
    timeout: Duration,
}

impl ApiConfig {
    /// Default base URL of the MyQ cloud API.
    pub const DEFAULT_BASE_URL: &'static str = "https://myqexternal.myqdevice.com";
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a configuration pointing at the production cloud host.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets a custom base URL.
    ///
    /// A trailing slash is stripped so paths can always start with `/`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        self.base_url = base_url;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Creates a [`Transport`] from this configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying HTTP client cannot be created.
    pub fn into_transport(self) -> Result<Transport, ProtocolError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ProtocolError::InvalidConfiguration(format!(
                "base URL must be http(s): {}",
                self.base_url
            )));
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(ProtocolError::Http)?;

        Ok(Transport {
            base_url: self.base_url,
            client,
        })
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Transport - Authenticated JSON request/response envelope
// ============================================================================

/// HTTP transport for the MyQ cloud API.
///
/// Sends a single authenticated JSON request per call, injecting the fixed
/// identification headers the vendor requires, and interprets the embedded
/// `ReturnCode` status field of every response.
#[derive(Debug, Clone)]
pub struct Transport {
    base_url: String,
    client: Client,
}

impl Transport {
    /// Creates a transport with default configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, ProtocolError> {
        ApiConfig::new().into_transport()
    }

    /// Returns the base URL of the endpoint.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a request and decodes the vendor response envelope.
    ///
    /// The fixed identification headers are always set; request-specific
    /// headers (the security token) are merged on top and win on conflict.
    ///
    /// # Errors
    ///
    /// - `ProtocolError` for transport failures, propagated unchanged
    /// - `ParseError` for non-JSON responses or a missing `ReturnCode`
    /// - `ApiError` when `ReturnCode` is not the literal `"0"`
    pub async fn send(&self, request: ApiRequest<'_>) -> Result<serde_json::Value, Error> {
        let url = format!("{}{}", self.base_url, request.path);

        tracing::debug!(method = %request.method, url = %url, "sending MyQ API request");

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header("Content-Type", "application/json")
            .header("User-Agent", USER_AGENT)
            .header("ApiVersion", API_VERSION)
            .header("BrandId", BRAND_ID)
            .header("Culture", CULTURE)
            .header("MyQApplicationId", MYQ_APPLICATION_ID);

        if !request.query.is_empty() {
            builder = builder.query(request.query);
        }
        if let Some(token) = request.security_token {
            builder = builder.header("SecurityToken", token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(ProtocolError::Http)?;
        let body = response.text().await.map_err(ProtocolError::Http)?;

        tracing::debug!(body = %body, "received MyQ API response");

        decode_envelope(&body)
    }
}

/// Decodes the vendor response envelope.
///
/// `ReturnCode == "0"` means success and yields the full payload; any other
/// code becomes an [`ApiError`] carrying the vendor's `ErrorMessage`.
fn decode_envelope(body: &str) -> Result<serde_json::Value, Error> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(ParseError::Json)?;

    let code = value
        .get("ReturnCode")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| ParseError::MissingField("ReturnCode".to_string()))?;

    if code == "0" {
        return Ok(value);
    }

    let message = value
        .get("ErrorMessage")
        .and_then(serde_json::Value::as_str)
        .filter(|message| !message.is_empty())
        .map(String::from);

    Err(ApiError::from_envelope(code, message).into())
}
