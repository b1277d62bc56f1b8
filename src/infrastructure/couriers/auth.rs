//! # Token Cache
//!
//! Session token storage shared by adapters that log in before calling.
//!
//! The cache holds at most one token with its expiry. Concurrent callers
//! that find it empty serialize on the login, so a burst of requests
//! triggers a single authentication round-trip.

use crate::infrastructure::couriers::error::CourierResult;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Tokens are treated as expired this long before their real expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Lazily refreshed session token.
#[derive(Debug)]
pub struct TokenCache {
    lifetime: Duration,
    token: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    /// Creates an empty cache whose tokens live for `lifetime`.
    #[must_use]
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            token: Mutex::new(None),
        }
    }

    /// Returns the token lifetime.
    #[inline]
    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Returns a valid token, calling `login` if none is cached.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `login`; nothing is cached then.
    pub async fn get_or_authenticate<F, Fut>(&self, login: F) -> CourierResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CourierResult<String>>,
    {
        let mut guard = self.token.lock().await;
        if let Some(cached) = guard.as_ref()
            && Instant::now() + EXPIRY_MARGIN < cached.expires_at
        {
            return Ok(cached.value.clone());
        }

        let value = login().await?;
        *guard = Some(CachedToken {
            value: value.clone(),
            expires_at: Instant::now() + self.lifetime,
        });
        Ok(value)
    }

    /// Runs `call` with a valid token.
    ///
    /// When `call` fails with an authentication error the cached token is
    /// dropped, so the next call logs in again. The failing call itself
    /// is not retried.
    ///
    /// # Errors
    ///
    /// Propagates login failures and the error returned by `call`.
    pub async fn with_token<T, L, LFut, F, Fut>(&self, login: L, call: F) -> CourierResult<T>
    where
        L: FnOnce() -> LFut,
        LFut: Future<Output = CourierResult<String>>,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = CourierResult<T>>,
    {
        let token = self.get_or_authenticate(login).await?;
        let result = call(token).await;
        if let Err(e) = &result
            && e.is_authentication()
        {
            debug!(error = %e, "Session rejected, dropping cached token");
            self.invalidate().await;
        }
        result
    }

    /// Drops the cached token so the next call logs in again.
    pub async fn invalidate(&self) {
        self.token.lock().await.take();
    }

    /// Returns true if a token is currently cached.
    pub async fn is_cached(&self) -> bool {
        self.token.lock().await.is_some()
    }
}
