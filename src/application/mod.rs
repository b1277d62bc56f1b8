//! # Application Layer
//!
//! Use cases over the domain model: the aggregation service, its request
//! and response DTOs, and the error type every service returns.

pub mod dto;
pub mod error;
pub mod services;
