//! Broker API surface
//!
//! The operations the reconciliation engine needs from a transport. Payloads
//! stay as raw JSON so API responses reach the caller unchanged.

use anyhow::Result;
use serde_json::Value;

/// One page of a listing call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaginatedResult {
    pub items: Vec<Value>,
    pub next_token: Option<String>,
}

impl PaginatedResult {
    /// Split a listing response into its records and continuation token.
    ///
    /// A missing item array is an empty page. An empty token is treated the
    /// same as an absent one.
    pub fn from_response(response: &Value, items_field: &str) -> Self {
        let items = response
            .get(items_field)
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let next_token = response
            .get("NextToken")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        Self { items, next_token }
    }
}

/// Operations consumed from the broker control plane.
///
/// Every call either succeeds with the raw API payload or fails with an error
/// the engine propagates unchanged; retries are the implementor's business.
#[allow(async_fn_in_trait)]
pub trait MqApi {
    /// List broker summaries (`BrokerName`, `BrokerId`, ...)
    async fn list_brokers(&self, max_results: u32, next_token: Option<&str>)
        -> Result<PaginatedResult>;

    async fn describe_broker(&self, broker_id: &str) -> Result<Value>;

    async fn create_broker(&self, request: &Value) -> Result<Value>;

    async fn update_broker(&self, broker_id: &str, request: &Value) -> Result<Value>;

    async fn delete_broker(&self, broker_id: &str) -> Result<Value>;

    async fn reboot_broker(&self, broker_id: &str) -> Result<Value>;

    /// List user records of a broker, one page at a time
    async fn list_users(
        &self,
        broker_id: &str,
        max_results: u32,
        next_token: Option<&str>,
    ) -> Result<PaginatedResult>;
}
