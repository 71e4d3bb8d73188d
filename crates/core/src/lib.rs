//! Core library for the nvenc encoding server.
//!
//! Holds the job-scoped command execution pipeline: storage layout and
//! path confinement, job identity, command template validation and
//! binding, the serial/parallel execution gate, and the external
//! process executor. No HTTP types live here -- the `nvenc-api` crate
//! wraps these building blocks behind its handlers.

pub mod error;
pub mod executor;
pub mod gate;
pub mod job;
pub mod storage;
pub mod template;

pub use error::CoreError;
