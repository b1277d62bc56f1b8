//! # Courier Errors
//!
//! Error types for courier provider operations.
//!
//! Adapters classify each failure by kind (transport, authentication,
//! decode, business rejection) and then wrap it with
//! [`CourierError::in_call`] so the message names the provider and the
//! failing operation.
//!
//! # Examples
//!
//! ```
//! use shipment_hub::infrastructure::couriers::error::CourierError;
//!
//! let error = CourierError::timeout("request timed out").in_call("XPRESSBEES", "calculate_rate");
//! assert!(error.is_retryable());
//! assert!(error.to_string().starts_with("XPRESSBEES calculate_rate failed"));
//! ```

use thiserror::Error;

/// Error type for courier provider operations.
#[derive(Debug, Clone, Error)]
pub enum CourierError {
    /// Request timed out.
    #[error("courier timeout: {message}")]
    Timeout {
        /// Error message.
        message: String,
    },

    /// Network or connection error, including 5xx responses.
    #[error("courier connection error: {message}")]
    Connection {
        /// Error message.
        message: String,
    },

    /// Authentication failed or the session was rejected.
    #[error("courier authentication error: {message}")]
    Authentication {
        /// Error message.
        message: String,
    },

    /// The courier throttled the request (HTTP 429).
    #[error("courier rate limit exceeded: {message}")]
    RateLimited {
        /// Error message.
        message: String,
    },

    /// The request was malformed or missing data the courier needs.
    #[error("courier invalid request: {message}")]
    InvalidRequest {
        /// Error message.
        message: String,
    },

    /// The courier processed the request and reported a failure.
    #[error("courier rejected request: {message}")]
    Rejected {
        /// Error message.
        message: String,
    },

    /// The response could not be decoded or had an unexpected shape.
    #[error("courier protocol error: {message}")]
    Protocol {
        /// Error message.
        message: String,
    },

    /// The capability is not offered by this courier.
    #[error("operation not supported: {operation}")]
    Unsupported {
        /// The operation name.
        operation: &'static str,
    },

    /// Adapter-internal failure.
    #[error("courier internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },

    /// A failure attributed to a provider and operation.
    #[error("{courier} {operation} failed: {source}")]
    Call {
        /// Courier code.
        courier: String,
        /// Failing operation.
        operation: &'static str,
        /// Underlying failure.
        #[source]
        source: Box<CourierError>,
    },
}

impl CourierError {
    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates an authentication error.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates a rate limited error.
    #[must_use]
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
        }
    }

    /// Creates an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a business rejection error.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[must_use]
    pub fn protocol_error(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an unsupported operation error.
    #[must_use]
    pub fn unsupported(operation: &'static str) -> Self {
        Self::Unsupported { operation }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Attributes this error to a courier and operation.
    ///
    /// Already-attributed errors are returned unchanged.
    #[must_use]
    pub fn in_call(self, courier: impl Into<String>, operation: &'static str) -> Self {
        match self {
            Self::Call { .. } => self,
            other => Self::Call {
                courier: courier.into(),
                operation,
                source: Box::new(other),
            },
        }
    }

    /// Returns the innermost error kind, unwrapping [`CourierError::Call`].
    #[must_use]
    pub fn kind(&self) -> &CourierError {
        match self {
            Self::Call { source, .. } => source.kind(),
            other => other,
        }
    }

    /// Returns true if this error is transient and may succeed on retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            Self::Timeout { .. } | Self::Connection { .. } | Self::RateLimited { .. }
        )
    }

    /// Returns true if the session token should be discarded.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self.kind(), Self::Authentication { .. })
    }
}

/// Result type for courier operations.
pub type CourierResult<T> = Result<T, CourierError>;
