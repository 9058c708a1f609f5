//! Application state for the web layer.

use std::sync::Arc;

use crate::facade::CachedSleeperClient;
use crate::limiter::TokenBucket;
use crate::sleeper::SleeperClient;

/// Shared application state.
///
/// Generic over the upstream and limiter so routes can be exercised against
/// a mock upstream.
pub struct AppState<U = SleeperClient, L = TokenBucket> {
    /// Cached, rate-limited Sleeper client
    pub sleeper: Arc<CachedSleeperClient<U, L>>,
}

impl<U, L> AppState<U, L> {
    /// Create a new app state.
    pub fn new(sleeper: CachedSleeperClient<U, L>) -> Self {
        Self {
            sleeper: Arc::new(sleeper),
        }
    }
}

// Derived Clone would require U: Clone and L: Clone.
impl<U, L> Clone for AppState<U, L> {
    fn clone(&self) -> Self {
        Self {
            sleeper: Arc::clone(&self.sleeper),
        }
    }
}
