pub mod config;

/// Common utilities shared across the PartsBay marketplace backend
///
/// This crate provides shared functionality used by the marketplace
/// services:
///
/// - Configuration loading (YAML file plus environment-held secrets)
/// - Shared test utilities and unique-id helpers

// Test helpers module - available for both development and test builds
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

#[cfg(any(test, feature = "test-helpers"))]
pub use test_helpers::{generate_unique_id, generate_unique_test_id};
