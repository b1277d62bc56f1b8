//! # Application Errors
//!
//! Error types for the application layer.
//!
//! Single-provider operations (create, track, cancel, NDR) return these
//! directly. Fan-out operations never do: per-provider failures are folded
//! into the response's error string instead.
//!
//! # Error Hierarchy
//!
//! ```text
//! ApplicationError
//! ├── Validation(String)       - Request rejected before any courier call
//! ├── UnknownCourier(String)   - Code not in the registry
//! ├── RateLimited { courier }  - Local token bucket denied the call
//! ├── DuplicateOrder(String)   - Order already has a tracking row
//! ├── NotFound { .. }          - Tracking row absent
//! ├── Courier(CourierError)    - Provider transport, auth or business failure
//! ├── Store(StoreError)        - Tracking store failure
//! └── Configuration(String)    - Invalid startup configuration
//! ```
//!
//! # Examples
//!
//! ```
//! use shipment_hub::application::error::ApplicationError;
//!
//! let err = ApplicationError::rate_limited("XPRESSBEES");
//! assert_eq!(err.to_string(), "rate limit exceeded for XPRESSBEES");
//! assert!(err.is_rate_limited());
//! ```

use crate::domain::errors::DomainError;
use crate::infrastructure::couriers::CourierError;
use crate::infrastructure::persistence::StoreError;
use thiserror::Error;

/// Application layer error.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Request failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Courier code is not registered.
    #[error("unknown courier: {0}")]
    UnknownCourier(String),

    /// The courier's local rate limiter denied the call.
    #[error("rate limit exceeded for {courier}")]
    RateLimited {
        /// Courier code.
        courier: String,
    },

    /// The order already has a shipment.
    #[error("shipment already exists for order {0}")]
    DuplicateOrder(String),

    /// Resource not found.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Type of resource.
        resource: &'static str,
        /// Resource identifier.
        id: String,
    },

    /// Courier call failed.
    #[error(transparent)]
    Courier(#[from] CourierError),

    /// Tracking store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration is invalid.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<DomainError> for ApplicationError {
    fn from(err: DomainError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl ApplicationError {
    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an unknown courier error.
    #[must_use]
    pub fn unknown_courier(code: impl Into<String>) -> Self {
        Self::UnknownCourier(code.into())
    }

    /// Creates a rate limited error.
    #[must_use]
    pub fn rate_limited(courier: impl Into<String>) -> Self {
        Self::RateLimited {
            courier: courier.into(),
        }
    }

    /// Creates a duplicate order error.
    #[must_use]
    pub fn duplicate_order(order_id: impl Into<String>) -> Self {
        Self::DuplicateOrder(order_id.into())
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::UnknownCourier(_))
            || matches!(self, Self::Store(e) if e.is_not_found())
    }

    /// Returns true if this is a local rate limit denial.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Returns true if the operation may succeed on retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Courier(e) => e.is_retryable(),
            Self::Store(e) => matches!(e, StoreError::Connection(_)),
            _ => false,
        }
    }
}

/// Result type for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_message_names_courier() {
        let err = ApplicationError::rate_limited("DELHIVERY");
        assert_eq!(err.to_string(), "rate limit exceeded for DELHIVERY");
        assert!(err.is_retryable());
    }

    #[test]
    fn domain_errors_become_validation() {
        let err: ApplicationError =
            DomainError::invalid_field("package_weight", "must be greater than zero").into();
        assert!(err.is_validation());
        assert!(err.to_string().contains("package_weight"));
    }

    #[test]
    fn courier_errors_keep_call_context() {
        let err: ApplicationError = CourierError::connection("reset")
            .in_call("BLUEDART", "track_shipment")
            .into();
        assert!(err.to_string().starts_with("BLUEDART track_shipment failed"));
        assert!(err.is_retryable());
    }

    #[test]
    fn not_found_covers_store_and_registry() {
        assert!(ApplicationError::unknown_courier("FEDEX").is_not_found());
        assert!(ApplicationError::not_found("shipment", "TRK1").is_not_found());
        let store: ApplicationError = StoreError::not_found("shipment tracking", "TRK1").into();
        assert!(store.is_not_found());
        assert!(!ApplicationError::duplicate_order("O1").is_not_found());
    }
}
