/// Shared test helpers for cross-crate use
///
/// Centralized here so the marketplace crate's unit and integration tests
/// can generate collision-free identifiers without duplicating the logic.
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

// Global counter for truly unique test identifiers across parallel tests
static GLOBAL_TEST_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate globally unique test identifiers that won't conflict across
/// parallel tests.
///
/// # Arguments
/// * `prefix` - A string prefix to identify the test type (e.g., "ORDER", "EVAL")
///
/// # Returns
/// A unique string in the format: "{prefix}-{timestamp}-{counter}"
pub fn generate_unique_id(prefix: &str) -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis();
    let counter = GLOBAL_TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}-{}", prefix, timestamp, counter)
}

/// Generate a unique numeric test ID, e.g. for fake gateway order ids.
pub fn generate_unique_test_id() -> u64 {
    use std::thread;

    let thread_id = thread::current().id();
    let thread_hash = format!("{:?}", thread_id)
        .chars()
        .map(|c| c as u64)
        .sum::<u64>()
        % 10000;

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64;

    let counter = GLOBAL_TEST_COUNTER.fetch_add(1, Ordering::SeqCst);

    (timestamp % 100000) * 1_000_000 + thread_hash * 100 + counter
}
