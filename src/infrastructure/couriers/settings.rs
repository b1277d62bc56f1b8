//! # Courier Settings
//!
//! Connection settings shared by every courier adapter.

use std::fmt;

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Credentials used to authenticate against a courier.
///
/// The meaning of the two fields depends on the courier: email/password
/// for Xpressbees, API token for Delhivery, client id/secret for Bluedart.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct CourierCredentials {
    api_key: String,
    api_secret: String,
}

impl CourierCredentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Returns the API key (or login name).
    #[inline]
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns the API secret (or password).
    #[inline]
    #[must_use]
    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }

    /// Returns true if an API key is configured.
    #[must_use]
    pub fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Returns true if both key and secret are configured.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.has_key() && !self.api_secret.trim().is_empty()
    }
}

impl fmt::Debug for CourierCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CourierCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Adapter configuration: endpoint, credentials and timeout.
///
/// # Examples
///
/// ```
/// use shipment_hub::infrastructure::couriers::settings::{CourierCredentials, CourierSettings};
///
/// let settings = CourierSettings::new("https://shipment.xpressbees.com/api")
///     .with_credentials(CourierCredentials::new("ops@acme.test", "secret"))
///     .with_timeout_ms(10_000);
///
/// assert_eq!(settings.timeout_ms(), 10_000);
/// assert!(settings.credentials().is_complete());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourierSettings {
    base_url: String,
    credentials: CourierCredentials,
    timeout_ms: u64,
}

impl CourierSettings {
    /// Creates settings for `base_url` with empty credentials.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credentials: CourierCredentials::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Sets the credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: CourierCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sets the request timeout in milliseconds.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Returns the base URL.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the credentials.
    #[inline]
    #[must_use]
    pub fn credentials(&self) -> &CourierCredentials {
        &self.credentials
    }

    /// Returns the request timeout in milliseconds.
    #[inline]
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secret() {
        let creds = CourierCredentials::new("key", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("key"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn blank_secret_is_incomplete() {
        let creds = CourierCredentials::new("key", "  ");
        assert!(creds.has_key());
        assert!(!creds.is_complete());
    }

    #[test]
    fn defaults() {
        let settings = CourierSettings::new("https://api.test");
        assert_eq!(settings.timeout_ms(), DEFAULT_TIMEOUT_MS);
        assert!(!settings.credentials().has_key());
    }
}
