//! Recording in-memory `MqApi` for unit tests

use super::api::{MqApi, PaginatedResult};
use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

/// A call observed by the fake
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    ListBrokers(Option<String>),
    Describe(String),
    Create(Value),
    Update(String, Value),
    Delete(String),
    Reboot(String),
    ListUsers(String, Option<String>),
}

/// Pages are keyed by the continuation token that requests them
#[derive(Default)]
pub(crate) struct FakeMq {
    broker_pages: HashMap<Option<String>, PaginatedResult>,
    user_pages: HashMap<Option<String>, PaginatedResult>,
    descriptions: HashMap<String, Value>,
    calls: Mutex<Vec<Call>>,
}

impl FakeMq {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Single-page broker listing from (name, id) pairs
    pub(crate) fn with_brokers(mut self, brokers: &[(&str, &str)]) -> Self {
        let items = brokers
            .iter()
            .map(|(name, id)| json!({"BrokerName": name, "BrokerId": id}))
            .collect();
        self.broker_pages
            .insert(None, PaginatedResult { items, next_token: None });
        for (name, id) in brokers {
            self.descriptions.insert(
                id.to_string(),
                json!({"BrokerId": id, "BrokerName": name, "BrokerState": "RUNNING"}),
            );
        }
        self
    }

    pub(crate) fn with_broker_page(
        mut self,
        token: Option<&str>,
        items: Vec<Value>,
        next_token: Option<&str>,
    ) -> Self {
        self.broker_pages.insert(
            token.map(String::from),
            PaginatedResult {
                items,
                next_token: next_token.map(String::from),
            },
        );
        self
    }

    pub(crate) fn with_user_page(
        mut self,
        token: Option<&str>,
        items: Vec<Value>,
        next_token: Option<&str>,
    ) -> Self {
        self.user_pages.insert(
            token.map(String::from),
            PaginatedResult {
                items,
                next_token: next_token.map(String::from),
            },
        );
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub(crate) fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    fn record(&self, call: Call) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl MqApi for FakeMq {
    async fn list_brokers(&self, _max_results: u32, next_token: Option<&str>) -> Result<PaginatedResult> {
        let token = next_token.map(String::from);
        self.record(Call::ListBrokers(token.clone()));
        Ok(self.broker_pages.get(&token).cloned().unwrap_or_default())
    }

    async fn describe_broker(&self, broker_id: &str) -> Result<Value> {
        self.record(Call::Describe(broker_id.to_string()));
        self.descriptions
            .get(broker_id)
            .cloned()
            .ok_or_else(|| anyhow!("no such broker: {}", broker_id))
    }

    async fn create_broker(&self, request: &Value) -> Result<Value> {
        self.record(Call::Create(request.clone()));
        Ok(json!({"BrokerId": "b-new", "BrokerArn": "arn:aws:mq:us-east-1:123456789012:broker:new:b-new"}))
    }

    async fn update_broker(&self, broker_id: &str, request: &Value) -> Result<Value> {
        self.record(Call::Update(broker_id.to_string(), request.clone()));
        Ok(json!({"BrokerId": broker_id}))
    }

    async fn delete_broker(&self, broker_id: &str) -> Result<Value> {
        self.record(Call::Delete(broker_id.to_string()));
        Ok(json!({"BrokerId": broker_id}))
    }

    async fn reboot_broker(&self, broker_id: &str) -> Result<Value> {
        self.record(Call::Reboot(broker_id.to_string()));
        Ok(json!({}))
    }

    async fn list_users(
        &self,
        broker_id: &str,
        _max_results: u32,
        next_token: Option<&str>,
    ) -> Result<PaginatedResult> {
        let token = next_token.map(String::from);
        self.record(Call::ListUsers(broker_id.to_string(), token.clone()));
        self.user_pages
            .get(&token)
            .cloned()
            .ok_or_else(|| anyhow!("unexpected users page token: {:?}", token))
    }
}
