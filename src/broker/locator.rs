//! Broker Locator
//!
//! The API has no lookup by name, so a broker's identifier is found by
//! scanning the broker listing. Nothing is cached between invocations.

use super::paging::PageCursor;
use crate::mq::MqApi;
use anyhow::{Context, Result};

/// Page size used when listing brokers
pub const BROKER_PAGE_SIZE: u32 = 100;

/// Resolve a broker name to its identifier.
///
/// Matching is exact and case-sensitive; the first match wins. `Ok(None)`
/// means no broker carries that name.
pub async fn resolve_broker_id<T: MqApi>(api: &T, broker_name: &str) -> Result<Option<String>> {
    let mut cursor = PageCursor::new();

    loop {
        let page = api
            .list_brokers(BROKER_PAGE_SIZE, cursor.token())
            .await
            .context("Couldn't list brokers")?;

        let found = page.items.iter().find_map(|summary| {
            let name = summary.get("BrokerName").and_then(|v| v.as_str())?;
            if name != broker_name {
                return None;
            }
            summary.get("BrokerId").and_then(|v| v.as_str()).map(String::from)
        });

        if let Some(broker_id) = found {
            tracing::debug!("Resolved broker '{}' to {}", broker_name, broker_id);
            return Ok(Some(broker_id));
        }

        if !cursor.advance(page.next_token)? {
            tracing::debug!("No broker named '{}'", broker_name);
            return Ok(None);
        }
    }
}
