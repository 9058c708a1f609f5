//! Sleeper context proxy.
//!
//! A read-only proxy in front of the Sleeper fantasy sports API that
//! throttles, caches and validates requests, and exposes the results to
//! agents through a small function-calling protocol.

pub mod cache;
pub mod config;
pub mod facade;
pub mod limiter;
pub mod mcp;
pub mod sleeper;
pub mod web;
