//! Broker Reconciliation
//!
//! Drives a broker towards a requested state: create it if absent, update it
//! if present, delete it, or reboot it. Existence is re-resolved on every run.
//! All local validation happens before any mutating call.

use super::error::BrokerError;
use super::locator::resolve_broker_id;
use super::params::{build_request, check_update_allowed, set_param, DesiredState, RequestBody};
use super::registry::{field_path, get_registry};
use crate::mq::MqApi;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Account id used in placeholder ARNs produced by dry runs
const PLACEHOLDER_ACCOUNT: &str = "000000000000";

/// Requested broker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetState {
    #[default]
    Present,
    Absent,
    Restarted,
}

impl FromStr for TargetState {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            "restarted" => Ok(Self::Restarted),
            other => Err(BrokerError::InvalidState(other.to_string())),
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Restarted => "restarted",
        };
        f.write_str(s)
    }
}

/// How an update treats creation-only parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePolicy {
    /// Leave them out of the request, so re-applying a creation
    /// declaration does not fail
    #[default]
    DropCreateOnly,
    /// Fail the update before any call
    RejectCreateOnly,
}

/// Options for a reconciliation run
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Skip every mutating call
    pub dry_run: bool,
    pub update_policy: UpdatePolicy,
    /// Region used for placeholder ARNs in dry runs
    pub region: String,
}

/// Result of a reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileOutcome {
    /// Raw API payload
    pub broker: Value,
    pub changed: bool,
}

impl ReconcileOutcome {
    fn changed(broker: Value) -> Self {
        Self {
            broker,
            changed: true,
        }
    }
}

/// Broker reconciler over an API transport
pub struct Reconciler<'a, T> {
    api: &'a T,
    options: ReconcileOptions,
}

impl<'a, T: MqApi> Reconciler<'a, T> {
    pub fn new(api: &'a T, options: ReconcileOptions) -> Self {
        Self { api, options }
    }

    /// Bring the broker named in `desired` to `target`.
    ///
    /// Every path that reaches the API reports `changed`; updates are not
    /// compared against the live broker.
    pub async fn reconcile(&self, target: TargetState, desired: &DesiredState) -> Result<ReconcileOutcome> {
        let broker_name = desired
            .get("broker_name")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or(BrokerError::MissingBrokerName)?;

        tracing::info!("Reconciling broker '{}' to state {}", broker_name, target);

        let broker_id = resolve_broker_id(self.api, broker_name).await?;

        match (target, broker_id) {
            (TargetState::Present, None) => self.create_broker(broker_name, desired).await,
            (TargetState::Present, Some(id)) => self.update_broker(&id, desired).await,
            (TargetState::Absent, Some(id)) => self.delete_broker(&id).await,
            (TargetState::Restarted, Some(id)) => self.reboot_broker(&id).await,
            (TargetState::Absent | TargetState::Restarted, None) => Err(BrokerError::NotFound {
                name: broker_name.to_string(),
            }
            .into()),
        }
    }

    /// Describe a broker by identifier, or by name when no identifier is given.
    /// Empty strings count as not given.
    pub async fn describe(&self, broker_id: Option<&str>, broker_name: Option<&str>) -> Result<Value> {
        let broker_id = broker_id.filter(|id| !id.is_empty());
        let broker_name = broker_name.filter(|name| !name.is_empty());

        let broker_id = match (broker_id, broker_name) {
            (Some(id), _) => id.to_string(),
            (None, Some(name)) => resolve_broker_id(self.api, name)
                .await?
                .ok_or_else(|| BrokerError::NotFound {
                    name: name.to_string(),
                })?,
            (None, None) => return Err(BrokerError::MissingIdentity.into()),
        };

        self.describe_by_id(&broker_id).await
    }

    async fn describe_by_id(&self, broker_id: &str) -> Result<Value> {
        self.api
            .describe_broker(broker_id)
            .await
            .context("Couldn't get broker details")
    }

    async fn create_broker(&self, broker_name: &str, desired: &DesiredState) -> Result<ReconcileOutcome> {
        let body = creation_request(desired)?;

        if self.options.dry_run {
            tracing::info!("Dry run: would create broker '{}'", broker_name);
            return Ok(ReconcileOutcome::changed(self.placeholder_identity(broker_name)));
        }

        tracing::info!("Creating broker '{}'", broker_name);
        let result = self
            .api
            .create_broker(&Value::Object(body))
            .await
            .context("Couldn't create broker")?;

        Ok(ReconcileOutcome::changed(result))
    }

    async fn update_broker(&self, broker_id: &str, desired: &DesiredState) -> Result<ReconcileOutcome> {
        if self.options.update_policy == UpdatePolicy::RejectCreateOnly {
            check_update_allowed(desired, &get_registry().create_only)?;
        }

        let mut body = build_request(desired, false, true);
        // The identifier travels in the request path
        if let Some(path) = field_path("broker_name") {
            body.remove(path.root());
        }

        if self.options.dry_run {
            tracing::info!("Dry run: would update broker {}", broker_id);
            return Ok(ReconcileOutcome::changed(json!({ "BrokerId": broker_id })));
        }

        tracing::info!("Updating broker {}", broker_id);
        let result = self
            .api
            .update_broker(broker_id, &Value::Object(body))
            .await
            .context("Couldn't update broker")?;

        Ok(ReconcileOutcome::changed(result))
    }

    async fn delete_broker(&self, broker_id: &str) -> Result<ReconcileOutcome> {
        let description = self.describe_by_id(broker_id).await?;

        if self.options.dry_run {
            tracing::info!("Dry run: would delete broker {}", broker_id);
        } else {
            tracing::info!("Deleting broker {}", broker_id);
            self.api
                .delete_broker(broker_id)
                .await
                .context("Couldn't delete broker")?;
        }

        Ok(ReconcileOutcome::changed(description))
    }

    async fn reboot_broker(&self, broker_id: &str) -> Result<ReconcileOutcome> {
        if self.options.dry_run {
            tracing::info!("Dry run: would reboot broker {}", broker_id);
        } else {
            tracing::info!("Rebooting broker {}", broker_id);
            self.api
                .reboot_broker(broker_id)
                .await
                .context("Couldn't reboot broker")?;
        }

        let description = self.describe_by_id(broker_id).await?;
        Ok(ReconcileOutcome::changed(description))
    }

    fn placeholder_identity(&self, broker_name: &str) -> Value {
        let broker_id = format!("b-{}", uuid::Uuid::new_v4());
        let region = if self.options.region.is_empty() {
            "us-east-1"
        } else {
            self.options.region.as_str()
        };
        json!({
            "BrokerId": broker_id,
            "BrokerArn": format!(
                "arn:aws:mq:{}:{}:broker:{}:{}",
                region, PLACEHOLDER_ACCOUNT, broker_name, broker_id
            ),
        })
    }
}

/// Build and validate the body of a creation request
pub fn creation_request(desired: &DesiredState) -> Result<RequestBody, BrokerError> {
    let registry = get_registry();
    let mut body = build_request(desired, true, false);

    if let Some(strategy) = body.get("AuthenticationStrategy").and_then(|v| v.as_str()) {
        if registry
            .unsupported_auth_strategies
            .iter()
            .any(|s| s == strategy)
        {
            return Err(BrokerError::UnsupportedAuthStrategy(strategy.to_string()));
        }
    }

    // The API refuses to create a broker without users
    if !body.contains_key("Users") {
        set_param(&mut body, "users", json!([registry.default_user.clone()]));
    }

    // An explicit key wins over the provider-owned key flag
    if let Some(Value::Object(encryption)) = body.get_mut("EncryptionOptions") {
        let has_key = encryption.get("KmsKeyId").map(|v| !v.is_null()).unwrap_or(false);
        if has_key {
            encryption.insert("UseAwsOwnedKey".to_string(), Value::Bool(false));
        }
    }

    let has_security_group = body
        .get("SecurityGroups")
        .and_then(|v| v.as_array())
        .map(|groups| !groups.is_empty())
        .unwrap_or(false);
    if !has_security_group {
        return Err(BrokerError::MissingSecurityGroup);
    }

    Ok(body)
}
