//! Broker API interaction module
//!
//! This module provides the transport side of mqctl: the operations the
//! reconciliation engine consumes, and the HTTP client that implements them
//! against the broker control-plane REST API.
//!
//! # Module Structure
//!
//! - [`api`] - The `MqApi` trait and the paginated listing result
//! - [`client`] - Main broker client, implements `MqApi` over HTTP
//! - [`http`] - HTTP utilities for REST API calls and error classification
//!
//! # Example
//!
//! ```ignore
//! use mqctl::mq::{MqApi, MqClient};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = MqClient::new("https://mq.eu-west-1.amazonaws.com", None)?;
//!     let page = client.list_brokers(100, None).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod http;

#[cfg(test)]
pub(crate) mod fake;

pub use api::{MqApi, PaginatedResult};
pub use client::MqClient;
pub use http::{format_api_error, ApiError};
