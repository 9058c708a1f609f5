//! Process configuration, read from environment variables.
//!
//! Every setting is optional; defaults live next to each component's own
//! config type.
//!
//! | Variable | Default |
//! |---|---|
//! | `SLEEPER_BASE_URL` | `https://api.sleeper.app/v1` |
//! | `SLEEPER_TIMEOUT_SECS` | 10 |
//! | `SLEEPER_RATE_LIMIT_PER_MINUTE` | 1000 |
//! | `SLEEPER_RATE_LIMIT_BURST` | 50 |
//! | `SLEEPER_MAX_RETRIES` | 2 |
//! | `SLEEPER_RETRY_BACKOFF_MS` | 250 |
//! | `SLEEPER_CACHE_TTL_REFERENCE_SECS` | 21600 |
//! | `SLEEPER_CACHE_TTL_IDENTITY_SECS` | 300 |
//! | `SLEEPER_CACHE_TTL_LIVE_SECS` | 30 |
//! | `SLEEPER_CACHE_MAX_ENTRIES` | 1000 |
//! | `SLEEPER_CACHE_SWEEP_SECS` | 60 |
//! | `SLEEPER_LISTEN_ADDR` | `127.0.0.1:8000` |

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::facade::RetryPolicy;
use crate::limiter::RateLimitConfig;
use crate::sleeper::SleeperConfig;

/// Default address the HTTP server binds to.
const DEFAULT_LISTEN_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 8000);

/// Default interval between background cache sweeps.
const DEFAULT_SWEEP_SECS: u64 = 60;

/// A configuration variable could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value {value:?} for {var}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Everything needed to start the server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sleeper: SleeperConfig,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
    pub retry: RetryPolicy,
    pub listen_addr: SocketAddr,

    /// How often expired cache entries are purged in the background.
    pub sweep_interval: Duration,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup };

        let mut sleeper = SleeperConfig::new();
        if let Some(url) = env.string("SLEEPER_BASE_URL") {
            sleeper = sleeper.with_base_url(url);
        }
        if let Some(secs) = env.parse::<u64>("SLEEPER_TIMEOUT_SECS")? {
            sleeper = sleeper.with_timeout(secs);
        }

        let mut rate_limit = match env.parse::<u32>("SLEEPER_RATE_LIMIT_PER_MINUTE")? {
            Some(0) => {
                return Err(env.invalid("SLEEPER_RATE_LIMIT_PER_MINUTE", "must be positive"));
            }
            Some(n) => RateLimitConfig::new(n),
            None => RateLimitConfig::default(),
        };
        if let Some(burst) = env.parse::<u32>("SLEEPER_RATE_LIMIT_BURST")? {
            rate_limit = rate_limit.with_burst(burst);
        }

        let mut retry = RetryPolicy::default();
        if let Some(n) = env.parse::<u32>("SLEEPER_MAX_RETRIES")? {
            retry.max_retries = n;
        }
        if let Some(ms) = env.parse::<u64>("SLEEPER_RETRY_BACKOFF_MS")? {
            retry.base_backoff = Duration::from_millis(ms);
        }

        let mut cache = CacheConfig::default();
        if let Some(secs) = env.parse::<u64>("SLEEPER_CACHE_TTL_REFERENCE_SECS")? {
            cache.reference_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = env.parse::<u64>("SLEEPER_CACHE_TTL_IDENTITY_SECS")? {
            cache.identity_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = env.parse::<u64>("SLEEPER_CACHE_TTL_LIVE_SECS")? {
            cache.live_ttl = Duration::from_secs(secs);
        }
        if let Some(n) = env.parse::<u64>("SLEEPER_CACHE_MAX_ENTRIES")? {
            cache.max_capacity = n;
        }

        let sweep_interval = Duration::from_secs(
            env.parse::<u64>("SLEEPER_CACHE_SWEEP_SECS")?
                .unwrap_or(DEFAULT_SWEEP_SECS)
                .max(1),
        );

        let listen_addr = env
            .parse::<SocketAddr>("SLEEPER_LISTEN_ADDR")?
            .unwrap_or_else(|| SocketAddr::from(DEFAULT_LISTEN_ADDR));

        Ok(Self {
            sleeper,
            rate_limit,
            cache,
            retry,
            listen_addr,
            sweep_interval,
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Non-empty trimmed value of `var`.
    fn string(&self, var: &str) -> Option<String> {
        (self.lookup)(var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, var: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.string(var)
            .map(|raw| {
                raw.parse().map_err(|e: T::Err| ConfigError {
                    var,
                    value: raw.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    fn invalid(&self, var: &'static str, reason: &str) -> ConfigError {
        ConfigError {
            var,
            value: (self.lookup)(var).unwrap_or_default(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::sleeper::DEFAULT_BASE_URL;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.sleeper.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.sleeper.timeout_secs, 10);
        assert_eq!(config.rate_limit.requests_per_minute, 1000);
        assert_eq!(config.rate_limit.burst, 50);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.cache.live_ttl, Duration::from_secs(30));
        assert_eq!(config.listen_addr, "127.0.0.1:8000".parse().unwrap());
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup(&[
            ("SLEEPER_BASE_URL", "http://localhost:9000/v1/"),
            ("SLEEPER_TIMEOUT_SECS", "3"),
            ("SLEEPER_RATE_LIMIT_PER_MINUTE", "120"),
            ("SLEEPER_RATE_LIMIT_BURST", "10"),
            ("SLEEPER_MAX_RETRIES", "0"),
            ("SLEEPER_RETRY_BACKOFF_MS", "50"),
            ("SLEEPER_CACHE_TTL_REFERENCE_SECS", "7200"),
            ("SLEEPER_CACHE_TTL_IDENTITY_SECS", "60"),
            ("SLEEPER_CACHE_TTL_LIVE_SECS", "5"),
            ("SLEEPER_CACHE_MAX_ENTRIES", "64"),
            ("SLEEPER_CACHE_SWEEP_SECS", "0"),
            ("SLEEPER_LISTEN_ADDR", "0.0.0.0:3000"),
        ]))
        .unwrap();

        assert_eq!(config.sleeper.base_url, "http://localhost:9000/v1");
        assert_eq!(config.sleeper.timeout_secs, 3);
        assert_eq!(config.rate_limit.requests_per_minute, 120);
        assert_eq!(config.rate_limit.burst, 10);
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.retry.base_backoff, Duration::from_millis(50));
        assert_eq!(config.cache.reference_ttl, Duration::from_secs(7200));
        assert_eq!(config.cache.identity_ttl, Duration::from_secs(60));
        assert_eq!(config.cache.live_ttl, Duration::from_secs(5));
        assert_eq!(config.cache.max_capacity, 64);
        assert_eq!(config.sweep_interval, Duration::from_secs(1));
        assert_eq!(config.listen_addr, "0.0.0.0:3000".parse().unwrap());
    }

    #[test]
    fn invalid_number_is_reported() {
        let err = AppConfig::from_lookup(lookup(&[("SLEEPER_TIMEOUT_SECS", "soon")])).unwrap_err();

        assert_eq!(err.var, "SLEEPER_TIMEOUT_SECS");
        assert_eq!(err.value, "soon");
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("SLEEPER_RATE_LIMIT_PER_MINUTE", "0")]))
            .unwrap_err();

        assert_eq!(err.var, "SLEEPER_RATE_LIMIT_PER_MINUTE");
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = AppConfig::from_lookup(lookup(&[("SLEEPER_BASE_URL", "   ")])).unwrap();
        assert_eq!(config.sleeper.base_url, DEFAULT_BASE_URL);
    }
}
