//! User Fetcher
//!
//! Collects every user record of a broker across pages, drops records with
//! in-flight changes on request, and optionally keys the result by username.

use super::paging::PageCursor;
use crate::mq::MqApi;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// Default page size for user listings
pub const DEFAULT_USER_PAGE_SIZE: u32 = 100;

/// Field marking a user change that has not been applied yet
const PENDING_CHANGE_FIELD: &str = "PendingChange";

/// Field that uniquely names a user record
const USERNAME_FIELD: &str = "Username";

/// Drops records whose `field` equals `value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    pub field: String,
    pub value: String,
}

impl RecordFilter {
    pub fn new(field: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Users still waiting to be created
    pub fn skip_pending_create() -> Self {
        Self::new(PENDING_CHANGE_FIELD, "CREATE")
    }

    /// Users still waiting to be deleted
    pub fn skip_pending_delete() -> Self {
        Self::new(PENDING_CHANGE_FIELD, "DELETE")
    }

    fn rejects(&self, record: &Value) -> bool {
        record
            .get(&self.field)
            .and_then(|v| v.as_str())
            .map(|v| v == self.value)
            .unwrap_or(false)
    }
}

/// Options for a user listing
#[derive(Debug, Clone)]
pub struct UserQuery {
    pub max_results: u32,
    pub skip_pending_create: bool,
    pub skip_pending_delete: bool,
    pub as_map: bool,
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_USER_PAGE_SIZE,
            skip_pending_create: false,
            skip_pending_delete: false,
            as_map: false,
        }
    }
}

impl UserQuery {
    fn filters(&self) -> Vec<RecordFilter> {
        let mut filters = Vec::new();
        if self.skip_pending_create {
            filters.push(RecordFilter::skip_pending_create());
        }
        if self.skip_pending_delete {
            filters.push(RecordFilter::skip_pending_delete());
        }
        filters
    }
}

/// Users in listing order, or keyed by username
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UserListing {
    List(Vec<Value>),
    Map(Map<String, Value>),
}

/// Fetch every user record of a broker, in page order
pub async fn fetch_all_users<T: MqApi>(api: &T, broker_id: &str, page_size: u32) -> Result<Vec<Value>> {
    let mut all_items = Vec::new();
    let mut cursor = PageCursor::new();

    loop {
        let page = api
            .list_users(broker_id, page_size, cursor.token())
            .await
            .context("Failed to describe users")?;
        tracing::debug!("Fetched {} users of broker {}", page.items.len(), broker_id);
        all_items.extend(page.items);

        if !cursor.advance(page.next_token)? {
            break;
        }
    }

    Ok(all_items)
}

/// Drop records matched by any filter, keeping the order of the rest
pub fn filter_records(records: Vec<Value>, filters: &[RecordFilter]) -> Vec<Value> {
    if filters.is_empty() {
        return records;
    }

    records
        .into_iter()
        .filter(|record| !filters.iter().any(|f| f.rejects(record)))
        .collect()
}

/// Key records by a string field.
///
/// Records without the field are skipped. Keys are expected to be unique;
/// if one repeats, the later record replaces the earlier one.
pub fn key_by(records: Vec<Value>, field: &str) -> Map<String, Value> {
    let mut keyed = Map::new();

    for record in records {
        let Some(key) = record.get(field).and_then(|v| v.as_str()).map(String::from) else {
            tracing::debug!("Skipping record without '{}'", field);
            continue;
        };
        keyed.insert(key, record);
    }

    keyed
}

/// List a broker's users according to `query`
pub async fn list_users<T: MqApi>(api: &T, broker_id: &str, query: &UserQuery) -> Result<UserListing> {
    let records = fetch_all_users(api, broker_id, query.max_results).await?;
    let records = filter_records(records, &query.filters());

    if query.as_map {
        Ok(UserListing::Map(key_by(records, USERNAME_FIELD)))
    } else {
        Ok(UserListing::List(records))
    }
}
