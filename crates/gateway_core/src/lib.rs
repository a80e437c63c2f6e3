//! Deterministic gateway deployment primitives.
//!
//! This crate owns the invocation request/response contract, the route table
//! document, and the redeployment fingerprint. It intentionally excludes AWS
//! SDK and Lambda runtime concerns.

pub mod contract;
pub mod fingerprint;
pub mod route_table;
