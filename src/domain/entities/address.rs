//! # Address and Order Item
//!
//! Consignee, pickup and return addresses, and the line items of a
//! shipment.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A postal address with contact details.
///
/// Only `name`, `phone` and `pincode` are mandatory for shipment creation;
/// see [`Address::missing_fields`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    /// Contact name.
    pub name: String,
    /// Company or warehouse name.
    pub company_name: String,
    /// Contact phone number.
    pub phone: String,
    /// Contact email.
    pub email: String,
    /// First address line.
    pub address_line1: String,
    /// Second address line.
    pub address_line2: String,
    /// City.
    pub city: String,
    /// State.
    pub state: String,
    /// Postal code.
    pub pincode: String,
    /// GST identification number, if registered.
    pub gstin: Option<String>,
}

impl Address {
    /// Returns the names of mandatory fields that are blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.phone.trim().is_empty() {
            missing.push("phone");
        }
        if self.pincode.trim().is_empty() {
            missing.push("pincode");
        }
        missing
    }

    /// Returns true if every mandatory field is present.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Joins both address lines, skipping a blank second line.
    #[must_use]
    pub fn full_street(&self) -> String {
        if self.address_line2.trim().is_empty() {
            self.address_line1.clone()
        } else {
            format!("{}, {}", self.address_line1, self.address_line2)
        }
    }
}

/// A line item in a shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Product name.
    pub name: String,
    /// Stock keeping unit.
    #[serde(default)]
    pub sku: String,
    /// Number of units.
    pub quantity: u32,
    /// Unit price.
    pub price: Decimal,
    /// Harmonized System of Nomenclature code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hsn_code: Option<String>,
}
