//! # Identifier Types
//!
//! String-based identifiers used across the shipment core.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Courier code identifying a provider in the registry.
///
/// Codes are normalized to trimmed upper-case so that `"xpressbees"` and
/// `"XPRESSBEES"` resolve to the same provider.
///
/// # Examples
///
/// ```
/// use shipment_hub::domain::value_objects::CourierCode;
///
/// let code = CourierCode::new(" delhivery ");
/// assert_eq!(code.as_str(), "DELHIVERY");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CourierCode(String);

impl CourierCode {
    /// Xpressbees.
    pub const XPRESSBEES: &'static str = "XPRESSBEES";
    /// Delhivery.
    pub const DELHIVERY: &'static str = "DELHIVERY";
    /// Bluedart.
    pub const BLUEDART: &'static str = "BLUEDART";

    /// Creates a normalized courier code.
    #[must_use]
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_uppercase())
    }

    /// Returns the code as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the code is empty after normalization.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CourierCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CourierCode {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for CourierCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<CourierCode> for String {
    fn from(value: CourierCode) -> Self {
        value.0
    }
}

impl AsRef<str> for CourierCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CourierCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(CourierCode::new("  bluedart"), CourierCode::new("BLUEDART"));
        assert!(CourierCode::new("   ").is_empty());
    }

    #[test]
    fn borrows_as_str_for_map_lookup() {
        let mut map = HashMap::new();
        map.insert(CourierCode::new("xpressbees"), 1);
        assert_eq!(map.get(CourierCode::XPRESSBEES), Some(&1));
    }

    #[test]
    fn deserializes_through_normalization() {
        let code: CourierCode = serde_json::from_str("\"delhivery\"").unwrap();
        assert_eq!(code.as_str(), CourierCode::DELHIVERY);
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"DELHIVERY\"");
    }
}
