//! # Courier Registry
//!
//! Maps courier codes to a provider and its dedicated rate limiter.
//!
//! Built once at startup and read concurrently by every in-flight
//! request. Entries are cheap to clone (two `Arc`s), so lookups hand out
//! owned copies and never hold the lock across a courier call.

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::domain::value_objects::CourierCode;
use crate::infrastructure::couriers::{CourierProvider, ProviderInfo};
use crate::infrastructure::rate_limit::RateLimiter;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// A registered courier: its adapter and token bucket.
#[derive(Debug, Clone)]
pub struct RegisteredCourier {
    code: CourierCode,
    provider: Arc<dyn CourierProvider>,
    limiter: Arc<RateLimiter>,
}

impl RegisteredCourier {
    /// Returns the courier code.
    #[inline]
    #[must_use]
    pub fn code(&self) -> &CourierCode {
        &self.code
    }

    /// Returns the adapter.
    #[inline]
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn CourierProvider> {
        &self.provider
    }

    /// Returns the rate limiter.
    #[inline]
    #[must_use]
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Takes a token from this courier's bucket.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::RateLimited` if the bucket is empty.
    pub fn acquire(&self) -> ApplicationResult<()> {
        if self.limiter.allow() {
            Ok(())
        } else {
            Err(ApplicationError::rate_limited(self.code.as_str()))
        }
    }
}

/// A registered courier as reported by health checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourierStatus {
    /// Provider description.
    #[serde(flatten)]
    pub info: ProviderInfo,
    /// Tokens left in the courier's bucket.
    pub available_tokens: f64,
}

/// Registry of couriers keyed by code.
#[derive(Debug, Default)]
pub struct CourierRegistry {
    couriers: RwLock<HashMap<CourierCode, RegisteredCourier>>,
}

impl CourierRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a courier under the code from its provider info.
    ///
    /// Returns the entry it replaced, if any.
    pub fn register(
        &self,
        provider: Arc<dyn CourierProvider>,
        limiter: RateLimiter,
    ) -> Option<RegisteredCourier> {
        let code = provider.provider_info().code;
        let entry = RegisteredCourier {
            code: code.clone(),
            provider,
            limiter: Arc::new(limiter),
        };
        self.couriers.write().insert(code, entry)
    }

    /// Looks up a courier. Codes are matched case-insensitively.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<RegisteredCourier> {
        let code = CourierCode::new(code);
        self.couriers.read().get(code.as_str()).cloned()
    }

    /// Looks up a courier, failing on unknown codes.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::UnknownCourier` if the code is not registered.
    pub fn resolve(&self, code: &str) -> ApplicationResult<RegisteredCourier> {
        self.get(code)
            .ok_or_else(|| ApplicationError::unknown_courier(CourierCode::new(code).as_str()))
    }

    /// Selects the couriers a fan-out should ask.
    ///
    /// An empty `codes` selects every registered courier. Otherwise
    /// unregistered codes are skipped and duplicates collapse. The result
    /// is ordered by code.
    #[must_use]
    pub fn select(&self, codes: &[CourierCode]) -> Vec<RegisteredCourier> {
        let couriers = self.couriers.read();
        let mut selected: Vec<_> = if codes.is_empty() {
            couriers.values().cloned().collect()
        } else {
            codes
                .iter()
                .map(|code| CourierCode::new(code))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .filter_map(|code| couriers.get(&code).cloned())
                .collect()
        };
        selected.sort_by(|a, b| a.code.cmp(&b.code));
        selected
    }

    /// Returns the registered codes, sorted.
    #[must_use]
    pub fn codes(&self) -> Vec<CourierCode> {
        let mut codes: Vec<_> = self.couriers.read().keys().cloned().collect();
        codes.sort();
        codes
    }

    /// Returns every registered courier with its current token count,
    /// sorted by code.
    #[must_use]
    pub fn statuses(&self) -> Vec<CourierStatus> {
        self.select(&[])
            .iter()
            .map(|courier| CourierStatus {
                info: courier.provider.provider_info(),
                available_tokens: courier.limiter.available(),
            })
            .collect()
    }

    /// Returns the number of registered couriers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.couriers.read().len()
    }

    /// Returns true if no courier is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.couriers.read().is_empty()
    }
}
