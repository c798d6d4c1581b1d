//! Checks applied to the configuration before any resource is created.

use thiserror::Error;

use pool_config::DEFAULT_DEV_DONATION;

/// Configuration key holding the operator address.
pub const POOL_ADDRESS_KEY: &str = "pool_server.pool_address";

/// Reasons the operator address was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// No address was configured.
    #[error("Invalid pool wallet address in configuration file ({POOL_ADDRESS_KEY}): address is empty")]
    Empty,
    /// The address contains whitespace.
    #[error("Invalid pool wallet address in configuration file ({POOL_ADDRESS_KEY}): contains whitespace")]
    Whitespace,
    /// The address contains the `*` wildcard.
    #[error("Invalid pool wallet address in configuration file ({POOL_ADDRESS_KEY}): contains a wildcard")]
    Wildcard,
}

/// Rejects empty addresses and addresses containing whitespace or `*`.
pub fn validate_pool_address(address: &str) -> Result<(), AddressError> {
    if address.is_empty() {
        return Err(AddressError::Empty);
    }
    if address.chars().any(char::is_whitespace) {
        return Err(AddressError::Whitespace);
    }
    if address.contains('*') {
        return Err(AddressError::Wildcard);
    }
    Ok(())
}

/// Returns the fee when it sits below the recommended developer donation.
#[must_use]
pub fn dev_donation_advisory(fee: f64) -> Option<f64> {
    (fee < DEFAULT_DEV_DONATION).then_some(fee)
}
