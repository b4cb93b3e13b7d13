//! Shared test utilities for jobflow integration tests.
//!
//! This module provides:
//! - `TestHarness` for service tests against a temp media directory
//! - Builders and action helpers for walking jobs through their lifecycle

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
