//! Integration tests for parallel partition evaluation

mod common;

use common::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Worker thread that evaluated a record, and how many tasks had started by then.
type Observation = (i32, String, usize);

#[test]
fn test_partitions_run_concurrently() {
    let context = create_test_context_with_threads("parallel", memory_store(), 4);
    let arrived = Arc::new(AtomicUsize::new(0));

    let observed: Vec<Observation> = context
        .parallelize_with_partitions(vec![0, 1, 2, 3], 4)
        .map({
            let arrived = arrived.clone();
            move |x| {
                arrived.fetch_add(1, Ordering::SeqCst);
                // wait for the other partitions; a sequential run times out here
                let deadline = Instant::now() + Duration::from_secs(5);
                while arrived.load(Ordering::SeqCst) < 4 && Instant::now() < deadline {
                    thread::sleep(Duration::from_millis(1));
                }
                let name = thread::current().name().unwrap_or_default().to_string();
                (x, name, arrived.load(Ordering::SeqCst))
            }
        })
        .collect()
        .unwrap();

    assert_eq!(
        observed.iter().map(|(x, _, _)| *x).collect::<Vec<_>>(),
        vec![0, 1, 2, 3]
    );
    assert!(observed.iter().all(|(_, _, seen)| *seen == 4));

    let threads: HashSet<&str> = observed.iter().map(|(_, name, _)| name.as_str()).collect();
    assert_eq!(threads.len(), 4);
    assert!(threads.iter().all(|name| name.starts_with("sparklet-worker-")));
}

#[test]
fn test_pool_width_follows_max_concurrency() {
    let context = create_test_context_with_threads("narrow-pool", memory_store(), 2);
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let names: Vec<String> = context
        .parallelize_with_partitions((0..8).collect::<Vec<i32>>(), 8)
        .map({
            let running = running.clone();
            let peak = peak.clone();
            move |_| {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                running.fetch_sub(1, Ordering::SeqCst);
                thread::current().name().unwrap_or_default().to_string()
            }
        })
        .collect()
        .unwrap();

    assert_eq!(names.len(), 8);
    assert!(peak.load(Ordering::SeqCst) <= 2);
    let threads: HashSet<String> = names.into_iter().collect();
    assert!(threads.len() <= 2);
    assert!(threads.iter().all(|name| name.starts_with("sparklet-worker-")));
}
