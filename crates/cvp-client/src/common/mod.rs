//! Common utilities for the CVP API client
//!
//! Provides the authenticated HTTP wrapper and pagination helpers shared
//! by every endpoint.

pub mod pagination;

use crate::error::CvpError;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

/// HTTP client wrapper with authentication
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, CvpError> {
        let url = self.build_url(path);
        debug!("GET {}", url);

        let response = self.client
            .get(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .await?;

        Self::decode("GET", path, response).await
    }

    /// Make a POST request with a JSON body
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, CvpError> {
        let url = self.build_url(path);
        debug!("POST {} with body: {}", url, body);

        let response = self.client
            .post(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        Self::decode("POST", path, response).await
    }

    /// Make a multipart POST request
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, CvpError> {
        let url = self.build_url(path);
        debug!("POST {} (multipart)", url);

        let response = self.client
            .post(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .multipart(form)
            .send()
            .await?;

        Self::decode("POST", path, response).await
    }

    /// Build query string from parameters
    pub fn build_query_string(&self, params: &[(&str, &str)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Map status codes and CVP error envelopes, then decode the body
    async fn decode<T: DeserializeOwned>(
        method: &str,
        path: &str,
        response: Response,
    ) -> Result<T, CvpError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(CvpError::Authentication(format!(
                "{} {} rejected: {} - {}",
                method, path, status, body
            )));
        }

        if status == StatusCode::NOT_FOUND {
            return Err(CvpError::NotFound(format!(
                "Resource not found: {} - {}",
                path, body
            )));
        }

        if !status.is_success() {
            return Err(CvpError::Api(format!(
                "{} {} failed: {} - {}",
                method, path, status, body
            )));
        }

        let value: serde_json::Value = if body.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&body).map_err(|e| {
                CvpError::Api(format!(
                    "error decoding response body: {} - Response (first 500 chars): {}",
                    e,
                    body.chars().take(500).collect::<String>()
                ))
            })?
        };

        if let Some(err) = envelope_error(path, &value) {
            return Err(err);
        }

        serde_json::from_value(value).map_err(CvpError::Serialization)
    }
}

/// CVP reports many failures as HTTP 200 with an `errorCode` envelope
pub(crate) fn envelope_error(path: &str, value: &serde_json::Value) -> Option<CvpError> {
    let code = value.get("errorCode")?;
    let message = value
        .get("errorMessage")
        .and_then(|m| m.as_str())
        .unwrap_or_default();
    let code = code.as_str().map(str::to_string).unwrap_or_else(|| code.to_string());

    let lowered = message.to_ascii_lowercase();
    if lowered.contains("does not exist") || lowered.contains("not found") {
        Some(CvpError::NotFound(format!("{}: {} ({})", path, message, code)))
    } else {
        Some(CvpError::Api(format!("{}: {} ({})", path, message, code)))
    }
}
