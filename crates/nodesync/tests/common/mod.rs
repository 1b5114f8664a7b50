//! Shared test utilities for nodesync integration tests.
//!
//! This module provides:
//! - `TestHarness` with a temp directory, a file-backed database and a node service
//! - Scripted repository sources and recording sinks for driving `SyncTask`

pub mod fakes;
pub mod harness;

pub use fakes::*;
pub use harness::TestHarness;
