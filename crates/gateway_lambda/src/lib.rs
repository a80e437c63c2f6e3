//! Lambda runtime integration for the gateway handlers.
//!
//! This crate owns the per-route request handlers and the runtime binaries
//! that wrap them. Deterministic contract, route table, and fingerprint
//! primitives live in `gateway_core`.

pub mod handlers;
pub mod logging;
