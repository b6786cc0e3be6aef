//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the persistent Repository
//! - An in-memory arena for tests and ephemeral use
//! - Demo fixture data

pub mod demo;
pub mod duckdb;
pub mod memory;
