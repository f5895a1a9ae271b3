//! Common test utilities and helpers for integration tests

use tally_core::{ContextConfig, TallyContext};

/// Create a test context with a given name
pub fn create_test_context(name: &str) -> TallyContext {
    TallyContext::new(ContextConfig::new(name).with_parallelism(4)).unwrap()
}

/// Create test data for key-value pairs (String, i64)
#[allow(dead_code)]
pub fn create_test_string_i64_data() -> Vec<(String, i64)> {
    let keys = ["a", "b", "c", "d", "e"];
    (0..100i64)
        .map(|i| (keys[(i % 5) as usize].to_string(), i * 7 % 13))
        .collect()
}
