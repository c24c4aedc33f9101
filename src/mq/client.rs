//! Broker Client
//!
//! Main client for the broker control-plane REST API, combining the HTTP
//! client with an endpoint and an optional bearer token.

use super::api::{MqApi, PaginatedResult};
use super::http::MqHttpClient;
use anyhow::Result;
use serde_json::Value;

/// Main broker API client
#[derive(Clone)]
pub struct MqClient {
    pub http: MqHttpClient,
    pub endpoint: String,
    token: Option<String>,
}

impl MqClient {
    /// Create a new client for the given endpoint
    pub fn new(endpoint: &str, token: Option<String>) -> Result<Self> {
        let http = MqHttpClient::new()?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Make a GET request
    pub async fn get(&self, url: &str) -> Result<Value> {
        self.http.get(url, self.token.as_deref()).await
    }

    /// Make a POST request
    pub async fn post(&self, url: &str, body: Option<&Value>) -> Result<Value> {
        self.http.post(url, self.token.as_deref(), body).await
    }

    /// Make a PUT request
    pub async fn put(&self, url: &str, body: &Value) -> Result<Value> {
        self.http.put(url, self.token.as_deref(), body).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, url: &str) -> Result<Value> {
        self.http.delete(url, self.token.as_deref()).await
    }

    // =========================================================================
    // URL helpers
    // =========================================================================

    /// Broker collection URL
    pub fn brokers_url(&self) -> String {
        format!("{}/v1/brokers", self.endpoint)
    }

    /// Single broker URL
    pub fn broker_url(&self, broker_id: &str) -> String {
        format!("{}/{}", self.brokers_url(), urlencoding::encode(broker_id))
    }

    /// Broker users URL
    pub fn broker_users_url(&self, broker_id: &str) -> String {
        format!("{}/users", self.broker_url(broker_id))
    }
}

/// Append paging parameters to a listing URL
fn add_paging_params(url: &str, max_results: u32, next_token: Option<&str>) -> String {
    let mut query_parts = vec![format!("maxResults={}", max_results)];

    if let Some(token) = next_token {
        query_parts.push(format!("nextToken={}", urlencoding::encode(token)));
    }

    format!("{}?{}", url, query_parts.join("&"))
}

impl MqApi for MqClient {
    async fn list_brokers(
        &self,
        max_results: u32,
        next_token: Option<&str>,
    ) -> Result<PaginatedResult> {
        let url = add_paging_params(&self.brokers_url(), max_results, next_token);
        let response = self.get(&url).await?;
        Ok(PaginatedResult::from_response(&response, "BrokerSummaries"))
    }

    async fn describe_broker(&self, broker_id: &str) -> Result<Value> {
        self.get(&self.broker_url(broker_id)).await
    }

    async fn create_broker(&self, request: &Value) -> Result<Value> {
        self.post(&self.brokers_url(), Some(request)).await
    }

    async fn update_broker(&self, broker_id: &str, request: &Value) -> Result<Value> {
        self.put(&self.broker_url(broker_id), request).await
    }

    async fn delete_broker(&self, broker_id: &str) -> Result<Value> {
        self.delete(&self.broker_url(broker_id)).await
    }

    async fn reboot_broker(&self, broker_id: &str) -> Result<Value> {
        let url = format!("{}/reboot", self.broker_url(broker_id));
        self.post(&url, None).await
    }

    async fn list_users(
        &self,
        broker_id: &str,
        max_results: u32,
        next_token: Option<&str>,
    ) -> Result<PaginatedResult> {
        let url = add_paging_params(&self.broker_users_url(broker_id), max_results, next_token);
        let response = self.get(&url).await?;
        Ok(PaginatedResult::from_response(&response, "Users"))
    }
}
