//! Common test utilities and helpers for integration tests

use sparklet_common::{BlockStore, ObjectStoreBlockStore};
use sparklet_core::{ContextConfig, FlowContext};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory block store, concrete so tests can read its statistics.
pub fn memory_store() -> Arc<ObjectStoreBlockStore> {
    Arc::new(ObjectStoreBlockStore::in_memory().unwrap())
}

/// Memory store holding one text object.
#[allow(dead_code)]
pub fn store_with_lines(path: &str, lines: &[&str]) -> Arc<ObjectStoreBlockStore> {
    let store = memory_store();
    let lines: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
    store.write(path, &lines).unwrap();
    store
}

/// Create a test context with a given name over `store`
pub fn create_test_context(name: &str, store: Arc<ObjectStoreBlockStore>) -> FlowContext {
    create_test_context_with_threads(name, store, 4)
}

/// Create a test context with specific thread count
pub fn create_test_context_with_threads(
    name: &str,
    store: Arc<ObjectStoreBlockStore>,
    threads: usize,
) -> FlowContext {
    let config = ContextConfig::new(name)
        .with_default_parallelism(4)
        .with_max_concurrency(threads);
    FlowContext::with_config(config, store as Arc<dyn BlockStore>).unwrap()
}

/// Create test data for integer operations
#[allow(dead_code)]
pub fn create_test_i32_data() -> Vec<i32> {
    (1..=20).collect()
}

/// Create test data for key-value pairs (String, i32)
#[allow(dead_code)]
pub fn create_test_string_i32_data() -> Vec<(String, i32)> {
    vec![
        ("a".to_string(), 1),
        ("b".to_string(), 2),
        ("a".to_string(), 3),
        ("c".to_string(), 4),
        ("b".to_string(), 5),
        ("a".to_string(), 6),
    ]
}

/// Shared counter of user-function invocations.
#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

#[allow(dead_code)]
impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Assert that two vectors contain the same elements (order-independent)
#[allow(dead_code)]
pub fn assert_same_elements<T: Ord + Clone + std::fmt::Debug>(
    mut actual: Vec<T>,
    mut expected: Vec<T>,
) {
    actual.sort();
    expected.sort();
    assert_eq!(actual, expected);
}
