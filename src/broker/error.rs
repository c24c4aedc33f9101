//! Faults detected locally, before any mutating call is issued

/// Validation and protocol faults raised by the engine itself.
///
/// Transport failures are not represented here; they travel as the
/// transport's own error with operation context attached.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    #[error("'AuthenticationStrategy={0}' not supported, yet")]
    UnsupportedAuthStrategy(String),

    #[error("At least one security group must be specified on broker creation")]
    MissingSecurityGroup,

    #[error("'{field}' can only be set when the broker is created")]
    CreateOnlyOnUpdate { field: String },

    #[error("Either 'broker_id' or 'broker_name' must be specified")]
    MissingIdentity,

    #[error("'broker_name' is required")]
    MissingBrokerName,

    #[error("Cannot find broker with name {name}.")]
    NotFound { name: String },

    #[error("Invalid broker state requested ({0}). Valid are: 'present', 'absent', 'restarted'")]
    InvalidState(String),

    #[error("Listing returned continuation token '{cursor}' twice")]
    RepeatedCursor { cursor: String },
}

/// Find a `BrokerError` anywhere in an error chain
pub fn broker_error(error: &anyhow::Error) -> Option<&BrokerError> {
    error.chain().find_map(|e| e.downcast_ref::<BrokerError>())
}
