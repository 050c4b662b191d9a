//! Authentication decorator with a time-bounded session cache, plus the HTTP
//! service that exposes it.
//!
//! The reusable core lives in [`services`]: [`services::auth`] (identity model,
//! policy, decorator) and [`services::session`] (clock, store, sweeper).
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
