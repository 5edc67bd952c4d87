//! Series assembly.
//!
//! `reconciler` merges the archive and forecast sources into one daily
//! history; `cache` memoizes outcomes by call arguments.

pub mod cache;
pub mod reconciler;
