//! HTTP utilities for broker REST API calls

use anyhow::{Context, Result};
use reqwest::{Client, Method};
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Header carrying the error type on REST-JSON error responses
const ERROR_TYPE_HEADER: &str = "x-amzn-errortype";

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let char_count = body.chars().count();
    let truncated = if char_count > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// A non-success response from the broker API
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("API request failed: {status} ({}): {message}", .code.as_deref().unwrap_or("Unknown"))]
pub struct ApiError {
    pub status: u16,
    pub code: Option<String>,
    pub message: String,
}

impl ApiError {
    /// Build from the status, the error-type header and the response body
    pub fn from_response(status: u16, error_type: Option<&str>, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();

        // Header looks like "NotFoundException:http://internal..."
        let code = error_type
            .and_then(|t| t.split(':').next())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .or_else(|| {
                parsed.as_ref().and_then(|v| {
                    v.get("__type")
                        .or_else(|| v.get("code"))
                        .and_then(|c| c.as_str())
                        .map(|c| c.rsplit('#').next().unwrap_or(c).to_string())
                })
            });

        let message = parsed
            .as_ref()
            .and_then(|v| v.get("message").or_else(|| v.get("Message")))
            .and_then(|m| m.as_str())
            .map(|m| m.to_string())
            .unwrap_or_else(|| sanitize_for_log(body));

        Self {
            status,
            code,
            message,
        }
    }

    /// The server asked us to slow down
    pub fn is_throttled(&self) -> bool {
        self.status == 429
            || self
                .code
                .as_deref()
                .map(|c| c.contains("Throttl") || c == "TooManyRequestsException")
                .unwrap_or(false)
    }

    /// Worth retrying by a caller that owns a retry policy
    pub fn is_retryable(&self) -> bool {
        self.is_throttled() || (500..600).contains(&self.status)
    }
}

/// HTTP client wrapper for broker API calls
#[derive(Clone)]
pub struct MqHttpClient {
    client: Client,
}

impl MqHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("mqctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Make a GET request
    pub async fn get(&self, url: &str, token: Option<&str>) -> Result<Value> {
        self.send(Method::GET, url, token, None).await
    }

    /// Make a POST request
    pub async fn post(&self, url: &str, token: Option<&str>, body: Option<&Value>) -> Result<Value> {
        self.send(Method::POST, url, token, body).await
    }

    /// Make a PUT request
    pub async fn put(&self, url: &str, token: Option<&str>, body: &Value) -> Result<Value> {
        self.send(Method::PUT, url, token, Some(body)).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, url: &str, token: Option<&str>) -> Result<Value> {
        self.send(Method::DELETE, url, token, None).await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<Value> {
        tracing::debug!("{} {}", method, url);

        let mut request = self.client.request(method, url);

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        let error_type = response
            .headers()
            .get(ERROR_TYPE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let response_body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&response_body));
            return Err(
                ApiError::from_response(status.as_u16(), error_type.as_deref(), &response_body)
                    .into(),
            );
        }

        // Handle empty response
        if response_body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&response_body).context("Failed to parse response JSON")
    }
}

/// Format an error for display
/// Security: API errors are reduced to generic messages, local faults keep their text
pub fn format_api_error(error: &anyhow::Error) -> String {
    if let Some(api_error) = error.chain().find_map(|e| e.downcast_ref::<ApiError>()) {
        let generic = match api_error.status {
            400 => "Invalid request. Check your parameters.",
            401 => "Authentication failed. Check your endpoint token.",
            403 => "Permission denied. Check your IAM permissions.",
            404 => "Resource not found.",
            409 => "Resource conflict. The broker may already exist or be in a transitional state.",
            429 => "Rate limit exceeded. Please try again later.",
            500..=599 => "Broker service temporarily unavailable. Please try again.",
            _ => "Request failed. Check your network connection and try again.",
        };
        return format!("{}: {}", error, generic);
    }

    let error_str = format!("{:#}", error);
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(160)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}
