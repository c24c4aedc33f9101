//! Broker reconciliation engine
//!
//! Turns a flat desired-state declaration into broker API calls.
//!
//! # Architecture
//!
//! - [`registry`] - Parameter tables (field paths, defaults, creation-only set) from embedded JSON
//! - [`params`] - Builds nested request bodies and guards creation-only fields on update
//! - [`locator`] - Resolves a broker name to its identifier by listing
//! - [`users`] - Paginated user listing with filtering and keying
//! - [`reconcile`] - The present / absent / restarted state machine
//!
//! # Example
//!
//! ```ignore
//! use mqctl::broker::{Reconciler, ReconcileOptions, TargetState};
//!
//! async fn apply(client: &mqctl::mq::MqClient, desired: &serde_json::Map<String, serde_json::Value>)
//!     -> anyhow::Result<()>
//! {
//!     let outcome = Reconciler::new(client, ReconcileOptions::default())
//!         .reconcile(TargetState::Present, desired)
//!         .await?;
//!     println!("changed: {}", outcome.changed);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod locator;
pub mod paging;
pub mod params;
pub mod reconcile;
pub mod registry;
pub mod users;

pub use error::{broker_error, BrokerError};
pub use locator::resolve_broker_id;
pub use params::{build_request, check_update_allowed, DesiredState, RequestBody};
pub use reconcile::{
    creation_request, ReconcileOptions, ReconcileOutcome, Reconciler, TargetState, UpdatePolicy,
};
pub use registry::{field_path, get_registry, is_create_only, FieldPath};
pub use users::{list_users, RecordFilter, UserListing, UserQuery};
