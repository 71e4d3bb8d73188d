//! nvenc-api server library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! router) so integration tests and the binary entrypoint can both
//! access them.

pub mod config;
pub mod error;
pub mod gpu;
pub mod handlers;
pub mod host;
pub mod router;
pub mod routes;
pub mod state;
