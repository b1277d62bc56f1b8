//! # API Layer
//!
//! External interfaces to the shipment core.

pub mod rest;
