//! mqctl - declarative lifecycle management for managed message brokers
//!
//! - [`broker`] - The reconciliation engine
//! - [`mq`] - Broker API transport
//! - [`config`] - Persistent settings and declaration files

pub mod broker;
pub mod config;
pub mod mq;
