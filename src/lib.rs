// Public API for integration tests and library usage

pub mod api;
pub mod auth;
pub mod clock;
pub mod competition;
pub mod config;
pub mod error;
pub mod phase;
pub mod ranking;
pub mod store;
pub mod tally;
pub mod types;
