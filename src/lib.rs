//! UVDASH — UV index and copper price dashboard backend.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod analysis;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod engine;
pub mod export;
pub mod types;
