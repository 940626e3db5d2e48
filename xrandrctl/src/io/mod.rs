//! I/O helpers for controller runs.

pub mod config;
pub mod executor;
pub mod state_store;
