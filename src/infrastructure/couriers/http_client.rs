//! # HTTP Client Utilities
//!
//! Shared HTTP client for courier adapters.
//!
//! Wraps `reqwest` with a base URL, a per-request timeout, JSON and
//! form-encoded bodies, and status-code classification into
//! [`CourierError`] kinds.
//!
//! # Examples
//!
//! ```ignore
//! use shipment_hub::infrastructure::couriers::http_client::HttpClient;
//!
//! let client = HttpClient::new("https://shipment.xpressbees.com/api", 30_000)?;
//! let response: MyResponse = client.get("/courier", HeaderMap::new()).await?;
//! ```

use crate::infrastructure::couriers::error::{CourierError, CourierResult};
use reqwest::header::HeaderMap;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client wrapper for courier adapters.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    timeout_ms: u64,
}

impl HttpClient {
    /// Creates a new HTTP client for `base_url` with the given timeout.
    ///
    /// # Errors
    ///
    /// Returns `CourierError::Internal` if the client cannot be created.
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> CourierResult<Self> {
        Self::with_headers(base_url, timeout_ms, HeaderMap::new())
    }

    /// Creates a new HTTP client that sends `default_headers` on every call.
    ///
    /// # Errors
    ///
    /// Returns `CourierError::Internal` if the client cannot be created.
    pub fn with_headers(
        base_url: impl Into<String>,
        timeout_ms: u64,
        default_headers: HeaderMap,
    ) -> CourierResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .default_headers(default_headers)
            .build()
            .map_err(|e| {
                CourierError::internal_error(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_ms,
        })
    }

    /// Returns the configured timeout in milliseconds.
    #[inline]
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Returns the base URL without a trailing slash.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves `path` against the base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Makes a GET request and deserializes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the request fails, a classified error
    /// for non-2xx statuses, and `CourierError::Protocol` if the body
    /// cannot be decoded.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, headers: HeaderMap) -> CourierResult<T> {
        let response = self
            .client
            .get(self.url(path))
            .headers(headers)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        handle_response(response).await
    }

    /// Makes a GET request with query parameters.
    ///
    /// # Errors
    ///
    /// Same as [`HttpClient::get`].
    pub async fn get_with_params<T: DeserializeOwned, P: Serialize + ?Sized>(
        &self,
        path: &str,
        params: &P,
        headers: HeaderMap,
    ) -> CourierResult<T> {
        let response = self
            .client
            .get(self.url(path))
            .query(params)
            .headers(headers)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        handle_response(response).await
    }

    /// Makes a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// Same as [`HttpClient::get`].
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        headers: HeaderMap,
    ) -> CourierResult<T> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .headers(headers)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        handle_response(response).await
    }

    /// Makes a POST request with a form-encoded body.
    ///
    /// # Errors
    ///
    /// Same as [`HttpClient::get`].
    pub async fn post_form<T: DeserializeOwned, F: Serialize + ?Sized>(
        &self,
        path: &str,
        form: &F,
        headers: HeaderMap,
    ) -> CourierResult<T> {
        let response = self
            .client
            .post(self.url(path))
            .form(form)
            .headers(headers)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        handle_response(response).await
    }
}

/// Checks the status and deserializes a JSON body.
async fn handle_response<T: DeserializeOwned>(response: Response) -> CourierResult<T> {
    let status = response.status();

    if status.is_success() {
        let body = response
            .bytes()
            .await
            .map_err(|e| CourierError::connection(format!("Failed to read response: {}", e)))?;
        serde_json::from_slice::<T>(&body)
            .map_err(|e| CourierError::protocol_error(format!("Failed to parse response: {}", e)))
    } else {
        let error_body = response.text().await.unwrap_or_default();
        Err(map_status_error(status, &error_body))
    }
}

/// Maps a reqwest error to a CourierError.
fn map_reqwest_error(error: reqwest::Error) -> CourierError {
    if error.is_timeout() {
        CourierError::timeout("Request timed out")
    } else if error.is_connect() {
        CourierError::connection(format!("Connection failed: {}", error))
    } else {
        CourierError::connection(format!("HTTP request failed: {}", error))
    }
}

/// Maps an HTTP status code to a CourierError.
fn map_status_error(status: StatusCode, body: &str) -> CourierError {
    let body = truncate(body, 512);
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            CourierError::invalid_request(format!("Bad request ({}): {}", status, body))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            CourierError::authentication(format!("Authentication failed ({}): {}", status, body))
        }
        StatusCode::NOT_FOUND => {
            CourierError::protocol_error(format!("Resource not found: {}", body))
        }
        StatusCode::TOO_MANY_REQUESTS => CourierError::rate_limited("Rate limit exceeded"),
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => {
            CourierError::connection(format!("Server error ({}): {}", status, body))
        }
        _ => CourierError::protocol_error(format!("HTTP error ({}): {}", status, body)),
    }
}

fn truncate(body: &str, max_chars: usize) -> &str {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => body.get(..idx).unwrap_or(body),
        None => body,
    }
}
