//! Web layer for the Sleeper context proxy.
//!
//! Exposes the context protocol over HTTP, plus health and cache endpoints.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
