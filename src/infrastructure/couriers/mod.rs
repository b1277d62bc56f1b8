//! # Courier Adapters
//!
//! The [`CourierProvider`] port and one adapter per integrated courier.
//!
//! - [`XpressbeesProvider`]: JSON REST, email/password bearer session
//! - [`DelhiveryProvider`]: REST with a static API token, form-encoded create
//! - [`BluedartProvider`]: API gateway JSON with a JWT session
//!
//! Shared plumbing lives in [`http_client`] (status classification),
//! [`auth`] (session token cache) and [`settings`].

pub mod auth;
pub mod bluedart;
pub mod delhivery;
pub mod error;
pub mod http_client;
pub mod settings;
pub mod traits;
pub mod xpressbees;

pub use bluedart::BluedartProvider;
pub use delhivery::DelhiveryProvider;
pub use error::{CourierError, CourierResult};
pub use settings::{CourierCredentials, CourierSettings};
pub use traits::{
    CourierProvider, NdrAction, NdrActionType, NdrRecord, ProviderInfo, RateQuote,
    ShipmentBooking, TrackingEvent,
};
pub use xpressbees::XpressbeesProvider;
