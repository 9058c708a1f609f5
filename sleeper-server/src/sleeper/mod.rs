//! Sleeper API client.
//!
//! This module provides an HTTP client for the Sleeper fantasy sports API
//! (`https://api.sleeper.app/v1`), the records it returns, and a mock
//! upstream for tests.
//!
//! Key characteristics of Sleeper:
//! - Read-only, unauthenticated, limited to roughly 1000 requests per minute
//!   per source IP
//! - Identifiers are opaque strings (roster ids arrive as numbers)
//! - Unknown ids answer `404` or a literal `null` body

mod client;
mod endpoint;
mod error;
mod freshness;
pub mod mock;
mod types;

pub use client::{DEFAULT_BASE_URL, SleeperClient, SleeperConfig, Upstream};
pub use endpoint::{Endpoint, TtlClass};
pub use error::{SleeperError, UpstreamError, UpstreamErrorKind, ValidationError};
pub use freshness::{Freshness, UpstreamResponse};
pub use mock::MockUpstream;
pub use types::{League, LeagueStatus, NflState, Player, Players, Roster, RosterSettings, User};
