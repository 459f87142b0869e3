//! Cache invalidation binder: turns domain events into distributed cache
//! refreshes.

pub mod binder;
pub mod cache;
pub mod config;
pub mod error;
pub mod infra;
pub mod replay;
