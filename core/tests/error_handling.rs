//! Integration tests for failure propagation out of actions

mod common;

use common::*;
use sparklet_common::BlockStore;
use sparklet_core::{PairRddExt, RddError, TransformKind};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_failing_map_fails_collect_and_count() {
    let context = create_test_context("map-error", memory_store());
    let rdd = context
        .parallelize_with_partitions(strings(&["fine", "fine", "fine", "ok", "bad", "ok"]), 2)
        .try_map(|s: String| {
            anyhow::ensure!(s != "bad", "cannot handle record {s:?}");
            Ok(s.len())
        });

    let err = rdd.collect().unwrap_err();
    match &err {
        RddError::Transformation {
            rdd_id,
            kind,
            partition,
            source,
        } => {
            assert_eq!(*rdd_id, rdd.id());
            assert_eq!(*kind, TransformKind::Map);
            assert_eq!(*partition, 1);
            assert!(source.to_string().contains("\"bad\""));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = rdd.count().unwrap_err();
    assert_eq!(err.partition(), Some(1));
    assert!(!context.last_job_summary().unwrap().succeeded);
}

#[test]
fn test_take_fails_instead_of_partial_result() {
    let context = create_test_context("take-error", memory_store());
    let rdd = context
        .parallelize_with_partitions(vec![1, 2, 3, 4], 2)
        .try_filter(|x: &i32| {
            anyhow::ensure!(*x != 3, "bad record");
            Ok(true)
        });

    assert_eq!(rdd.take(2).unwrap(), vec![1, 2]);
    assert!(matches!(
        rdd.take(3),
        Err(RddError::Transformation { partition: 1, .. })
    ));
}

#[test]
fn test_panic_in_user_function_is_reported() {
    let context = create_test_context("panic", memory_store());
    let rdd = context
        .parallelize_with_partitions(vec![1, 2, 3, 4, 5, 6], 3)
        .map(|x: i32| {
            if x == 5 {
                panic!("record {x} exploded");
            }
            x
        });

    let err = rdd.collect().unwrap_err();
    assert_eq!(err.partition(), Some(2));
    assert!(err.to_string().contains("record 5 exploded"));

    // The context stays usable.
    assert_eq!(context.parallelize(vec![1, 2]).count().unwrap(), 2);
}

#[test]
fn test_panicking_combiner_is_attributed_to_shuffle() {
    let context = create_test_context("combiner-panic", memory_store());
    let rdd = context
        .parallelize_with_partitions(vec![("k".to_string(), 1), ("k".to_string(), 2)], 1)
        .reduce_by_key(|_, _| panic!("combiner failed"));

    let err = rdd.count().unwrap_err();
    assert!(matches!(
        err,
        RddError::Transformation {
            kind: TransformKind::ReduceByKey,
            partition: 0,
            ..
        }
    ));
}

#[test]
fn test_flat_map_error_aborts_partition() {
    let context = create_test_context("flat-map-error", memory_store());
    let seen = Counter::new();
    let rdd = {
        let seen = seen.clone();
        context
            .parallelize_with_partitions(vec![1, 2, 3], 1)
            .try_flat_map(move |x: i32| {
                seen.hit();
                anyhow::ensure!(x != 2, "two is not allowed");
                Ok(vec![x])
            })
    };

    assert!(matches!(
        rdd.collect(),
        Err(RddError::Transformation {
            kind: TransformKind::FlatMap,
            ..
        })
    ));
    assert_eq!(seen.get(), 2);
}

#[test]
fn test_missing_source() {
    let store = memory_store();
    let context = create_test_context("missing", store.clone());
    let rdd = context.text_file("nowhere.txt").map(|line| line.len());

    let err = rdd.count().unwrap_err();
    assert!(matches!(err, RddError::SourceNotFound { ref path } if path == "nowhere.txt"));
    assert_eq!(store.stats().read_count, 0);
}

#[test]
fn test_zero_partitions_fail_at_action_time() {
    let store = store_with_lines("in.txt", &["a", "b"]);
    let context = create_test_context("zero-partitions", store.clone());
    let calls = Counter::new();

    let rdd = {
        let calls = calls.clone();
        context
            .parallelize_with_partitions(vec![1, 2, 3], 0)
            .map(move |x| {
                calls.hit();
                x
            })
    };
    assert_eq!(rdd.num_partitions(), 0);
    assert!(matches!(rdd.collect(), Err(RddError::Partitioning(_))));
    assert_eq!(calls.get(), 0);

    let reduced = context
        .text_file("in.txt")
        .map(|w| (w, 1))
        .reduce_by_key_with_partitions(|a, b| a + b, 0);
    assert!(matches!(reduced.count(), Err(RddError::Partitioning(_))));

    let empty_source = context.text_file_with_partitions("in.txt", 0);
    assert!(matches!(empty_source.take(1), Err(RddError::Partitioning(_))));

    let repartitioned = context.text_file("in.txt").repartition(0);
    assert!(matches!(repartitioned.count(), Err(RddError::Partitioning(_))));

    assert_eq!(store.stats().read_count, 0);
}

#[test]
fn test_take_zero_reports_lineage_errors() {
    let store = memory_store();
    let context = create_test_context("take-zero", store.clone());

    let unpartitioned = context.parallelize_with_partitions(vec![1, 2, 3], 0);
    assert!(matches!(unpartitioned.count(), Err(RddError::Partitioning(_))));
    assert!(matches!(unpartitioned.take(0), Err(RddError::Partitioning(_))));

    let missing = context.text_file("nowhere.txt");
    assert!(matches!(
        missing.take(0),
        Err(RddError::SourceNotFound { ref path }) if path == "nowhere.txt"
    ));

    let summary = context.last_job_summary().unwrap();
    assert_eq!(summary.action, "take");
    assert_eq!(summary.target_rdd, missing.id());
    assert!(!summary.succeeded);

    let fine = context.parallelize_with_partitions(vec![1, 2, 3], 3);
    assert!(fine.take(0).unwrap().is_empty());
    assert!(context.last_job_summary().unwrap().succeeded);
}
