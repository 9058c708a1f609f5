//! Typed Sleeper operations with caching and rate limiting.
//!
//! Each operation validates its parameters, then serves from the cache or
//! loads through the rate limiter and upstream client. Transient upstream
//! failures are retried inside the shared load, so every waiter sees the
//! outcome of the whole retry sequence.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, warn};

use crate::cache::{CacheConfig, CacheStats, ResponseCache};
use crate::limiter::Throttle;
use crate::sleeper::{
    Endpoint, League, NflState, Players, Roster, SleeperError, Upstream, UpstreamError,
    UpstreamResponse, User, ValidationError,
};

/// Sport used when the caller doesn't name one.
pub const DEFAULT_SPORT: &str = "nfl";

/// First season Sleeper has data for.
const FIRST_SEASON: i32 = 2017;

/// How transient upstream failures are retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each further retry.
    pub base_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (zero-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(1 << attempt.min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_backoff: Duration::from_millis(250),
        }
    }
}

/// Sleeper client with caching, throttling and retries.
pub struct CachedSleeperClient<U, L> {
    upstream: Arc<U>,
    limiter: Arc<L>,
    cache: ResponseCache<Arc<Value>>,
    cache_config: CacheConfig,
    retry: RetryPolicy,
}

impl<U, L> CachedSleeperClient<U, L>
where
    U: Upstream,
    L: Throttle,
{
    /// Create a new cached client.
    pub fn new(upstream: U, limiter: L, cache_config: &CacheConfig, retry: RetryPolicy) -> Self {
        Self {
            upstream: Arc::new(upstream),
            limiter: Arc::new(limiter),
            cache: ResponseCache::new(cache_config),
            cache_config: cache_config.clone(),
            retry,
        }
    }

    /// Look up a user by username or user id.
    pub async fn get_user(&self, identifier: &str) -> Result<User, SleeperError> {
        let identifier = validate_id("identifier", identifier)?;
        self.fetch(Endpoint::User { identifier }).await
    }

    /// All NFL leagues a user belongs to in a season.
    pub async fn get_user_leagues(
        &self,
        user_id: &str,
        season: &str,
    ) -> Result<Vec<League>, SleeperError> {
        self.get_user_leagues_for_sport(user_id, DEFAULT_SPORT, season)
            .await
    }

    /// All leagues a user belongs to for a sport and season.
    pub async fn get_user_leagues_for_sport(
        &self,
        user_id: &str,
        sport: &str,
        season: &str,
    ) -> Result<Vec<League>, SleeperError> {
        let user_id = validate_id("user_id", user_id)?;
        let sport = validate_sport(sport)?;
        let season = validate_season(season)?;
        self.fetch(Endpoint::UserLeagues {
            user_id,
            sport,
            season,
        })
        .await
    }

    pub async fn get_league(&self, league_id: &str) -> Result<League, SleeperError> {
        let league_id = validate_id("league_id", league_id)?;
        self.fetch(Endpoint::League { league_id }).await
    }

    /// Rosters of a league, in upstream order.
    pub async fn get_league_rosters(&self, league_id: &str) -> Result<Vec<Roster>, SleeperError> {
        let league_id = validate_id("league_id", league_id)?;
        self.fetch(Endpoint::LeagueRosters { league_id }).await
    }

    pub async fn get_league_users(&self, league_id: &str) -> Result<Vec<User>, SleeperError> {
        let league_id = validate_id("league_id", league_id)?;
        self.fetch(Endpoint::LeagueUsers { league_id }).await
    }

    pub async fn get_nfl_state(&self) -> Result<NflState, SleeperError> {
        self.fetch(Endpoint::NflState).await
    }

    /// Players directory for a sport. Large; cached with the reference TTL.
    pub async fn get_players(&self, sport: &str) -> Result<Players, SleeperError> {
        let sport = validate_sport(sport)?;
        self.fetch(Endpoint::Players { sport }).await
    }

    /// Get cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Purge expired cache entries.
    pub async fn sweep_cache(&self) {
        self.cache.sweep().await;
    }

    /// Invalidate all cached entries.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }

    /// Serve `endpoint` from cache or upstream and decode it as `T`.
    async fn fetch<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<T, SleeperError> {
        let key = endpoint.cache_key();
        let default_ttl = self.cache_config.ttl_for(endpoint.ttl_class());

        let upstream = Arc::clone(&self.upstream);
        let limiter = Arc::clone(&self.limiter);
        let retry = self.retry;
        let body = self
            .cache
            .get_or_load_with(key.clone(), move || async move {
                let response =
                    load_with_retry(upstream.as_ref(), limiter.as_ref(), &endpoint, retry).await?;
                // Upstream headers may forbid storing or shorten the TTL.
                let ttl = response.freshness.ttl(default_ttl);
                Ok((Arc::new(response.body), ttl))
            })
            .await?;

        match T::deserialize(body.as_ref()) {
            Ok(record) => Ok(record),
            Err(e) => {
                // Don't keep serving a body we can't decode.
                self.cache.invalidate(&key).await;
                warn!(%key, error = %e, "upstream body did not match the expected shape");
                Err(UpstreamError::parse(e.to_string(), &body.to_string()).into())
            }
        }
    }
}

/// One logical upstream request: a permit per attempt, retrying transient
/// failures with exponential backoff.
async fn load_with_retry<U, L>(
    upstream: &U,
    limiter: &L,
    endpoint: &Endpoint,
    retry: RetryPolicy,
) -> Result<UpstreamResponse, SleeperError>
where
    U: Upstream,
    L: Throttle,
{
    let mut attempt = 0;

    loop {
        limiter.acquire().await;

        match upstream.fetch(endpoint).await {
            Ok(response) => {
                info!(endpoint = endpoint.name(), attempt, "upstream fetch succeeded");
                return Ok(response);
            }
            Err(e) if e.is_transient() && attempt < retry.max_retries => {
                let delay = retry.backoff(attempt);
                warn!(
                    endpoint = endpoint.name(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient upstream failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(endpoint = endpoint.name(), attempt, error = %e, "upstream fetch failed");
                return Err(e.into());
            }
        }
    }
}

/// Trim an identifier and check it is safe to place in a URL path.
fn validate_id(field: &'static str, raw: &str) -> Result<String, ValidationError> {
    let id = raw.trim();

    if id.is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    // Dot segments would be resolved away by URL parsing.
    if id == "." || id == ".." {
        return Err(ValidationError::new(field, "must not be a dot segment"));
    }

    if let Some(c) = id.chars().find(|c| {
        c.is_whitespace() || c.is_control() || matches!(c, '/' | '\\' | '?' | '#' | '%')
    }) {
        return Err(ValidationError::new(
            field,
            format!("must not contain {c:?}"),
        ));
    }

    Ok(id.to_string())
}

/// Sports are short lowercase ASCII words, e.g. `nfl`.
fn validate_sport(raw: &str) -> Result<String, ValidationError> {
    let sport = raw.trim().to_ascii_lowercase();

    if sport.is_empty() || sport.len() > 16 || !sport.bytes().all(|b| b.is_ascii_lowercase()) {
        return Err(ValidationError::new(
            "sport",
            "must be a short alphabetic code such as \"nfl\"",
        ));
    }

    Ok(sport)
}

/// A season is a four-digit year between Sleeper's first season and next year.
fn validate_season(raw: &str) -> Result<String, ValidationError> {
    let season = raw.trim();

    if season.len() != 4 || !season.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::new(
            "season",
            "must be a four-digit year such as \"2023\"",
        ));
    }

    let year: i32 = season
        .parse()
        .map_err(|_| ValidationError::new("season", "must be a four-digit year"))?;
    let latest = Utc::now().year() + 1;
    if !(FIRST_SEASON..=latest).contains(&year) {
        return Err(ValidationError::new(
            "season",
            format!("must be between {FIRST_SEASON} and {latest}"),
        ));
    }

    Ok(season.to_string())
}
