//! Storage directives carried by upstream responses.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// What a response's `Cache-Control` and `Expires` headers allow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Freshness {
    /// `no-store` or `private`: a shared cache must not keep the body.
    pub no_store: bool,

    /// `max-age`, or else the time left until `Expires`.
    pub max_age: Option<Duration>,
}

impl Freshness {
    /// Read the directives from raw header values. Unparsable parts are ignored.
    pub fn from_headers(
        cache_control: Option<&str>,
        expires: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut freshness = Freshness::default();

        for directive in cache_control.unwrap_or_default().split(',') {
            let (name, value) = match directive.split_once('=') {
                Some((name, value)) => (name.trim(), Some(value.trim().trim_matches('"'))),
                None => (directive.trim(), None),
            };

            if name.eq_ignore_ascii_case("no-store") || name.eq_ignore_ascii_case("private") {
                freshness.no_store = true;
            } else if name.eq_ignore_ascii_case("max-age") {
                if let Some(secs) = value.and_then(|v| v.parse::<u64>().ok()) {
                    freshness.max_age = Some(Duration::from_secs(secs));
                }
            }
        }

        if freshness.max_age.is_none() {
            freshness.max_age = expires
                .and_then(|e| DateTime::parse_from_rfc2822(e.trim()).ok())
                .map(|at| {
                    (at.with_timezone(&Utc) - now)
                        .to_std()
                        .unwrap_or(Duration::ZERO)
                });
        }

        freshness
    }

    /// How long to keep the body, given the endpoint's own TTL.
    ///
    /// `None` means don't store it. The upstream can shorten the TTL but
    /// never extend it.
    pub fn ttl(&self, default: Duration) -> Option<Duration> {
        if self.no_store {
            return None;
        }

        match self.max_age {
            Some(age) if age.is_zero() => None,
            Some(age) => Some(age.min(default)),
            None => Some(default),
        }
    }
}

/// A decoded upstream body and what its headers say about storing it.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub body: Value,
    pub freshness: Freshness,
}

impl UpstreamResponse {
    pub fn new(body: Value) -> Self {
        Self {
            body,
            freshness: Freshness::default(),
        }
    }

    pub fn with_freshness(mut self, freshness: Freshness) -> Self {
        self.freshness = freshness;
        self
    }
}
