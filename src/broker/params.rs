//! Request body construction
//!
//! Compiles the flat desired-state mapping into the nested body the broker
//! API expects, and enforces the creation-only partition on updates.

use super::error::BrokerError;
use super::registry::{field_path, get_registry};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Flat parameter name -> value, as supplied by the caller
pub type DesiredState = Map<String, Value>;

/// Nested request body sent to the API
pub type RequestBody = Map<String, Value>;

/// Write one flat parameter into the body at its registered path.
///
/// Returns `false` if the parameter has no path; callers only pass
/// registered keys.
pub fn set_param(body: &mut RequestBody, key: &str, value: Value) -> bool {
    match field_path(key) {
        Some(path) => {
            path.write(body, value);
            true
        }
        None => false,
    }
}

/// Build a request body from the desired state.
///
/// With `apply_defaults`, the default table is written first and explicit
/// values overwrite it. With `suppress_create_only`, creation-only parameters
/// are dropped so re-running an unchanged declaration stays idempotent.
/// Parameters without a registered path (credentials, region, state, ...)
/// are ignored, as are nulls.
pub fn build_request(
    desired: &DesiredState,
    apply_defaults: bool,
    suppress_create_only: bool,
) -> RequestBody {
    let registry = get_registry();
    let mut body = RequestBody::new();

    if apply_defaults {
        for (key, value) in &registry.defaults {
            set_param(&mut body, key, value.clone());
        }
    }

    for (key, value) in desired {
        if value.is_null() || !registry.field_paths.contains_key(key) {
            continue;
        }
        if suppress_create_only && registry.create_only.contains(key) {
            tracing::warn!("Ignoring '{}' on update: it can only be set on creation", key);
            continue;
        }
        set_param(&mut body, key, value.clone());
    }

    body
}

/// Reject an update that carries any creation-only parameter with a value.
pub fn check_update_allowed(
    desired: &DesiredState,
    create_only: &BTreeSet<String>,
) -> Result<(), BrokerError> {
    match desired
        .iter()
        .find(|(key, value)| !value.is_null() && create_only.contains(key.as_str()))
    {
        Some((field, _)) => Err(BrokerError::CreateOnlyOnUpdate {
            field: field.clone(),
        }),
        None => Ok(()),
    }
}
