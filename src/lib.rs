//! Stockwatch library
//!
//! Exposes the cache, the rate limiter, the data clients and the per-user
//! state so the binary and the integration tests share one implementation.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod logging;
pub mod rate_limit;
pub mod storage;
pub mod user;
