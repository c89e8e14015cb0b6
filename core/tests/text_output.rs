//! Integration tests for block-store sources and text output

mod common;

use common::*;
use sparklet_common::{BlockStore, StorageBackend, StorageBuilder};
use sparklet_core::{ContextConfig, FlowContext, PairRddExt};

#[test]
fn test_save_word_counts() {
    let store = store_with_lines("in/words.txt", &["b a", "a"]);
    let context = create_test_context("save", store.clone());

    context
        .text_file_with_partitions("in/words.txt", 1)
        .flat_map(|line: String| {
            line.split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .map(|word| (word, 1))
        .reduce_by_key_with_partitions(|a, b| a + b, 1)
        .map(|(word, count)| format!("{word},{count}"))
        .save_as_text_file("out/counts.txt")
        .unwrap();

    assert_eq!(store.read("out/counts.txt").unwrap(), vec!["b,1", "a,2"]);
    assert_eq!(store.stats().write_count, 2);
}

#[test]
fn test_save_keeps_partition_order() {
    let store = memory_store();
    let context = create_test_context("save-order", store.clone());
    context
        .parallelize_with_partitions((1..=7).collect::<Vec<i32>>(), 3)
        .save_as_text_file("numbers.txt")
        .unwrap();

    let lines = store.read("numbers.txt").unwrap();
    assert_eq!(lines, vec!["1", "2", "3", "4", "5", "6", "7"]);
}

#[test]
fn test_local_filesystem_source() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("input.txt"), "one two\nthree\n").unwrap();

    let store = StorageBuilder::new()
        .backend(StorageBackend::LocalFileSystem {
            root_path: dir.path().to_string_lossy().into_owned(),
        })
        .build()
        .unwrap();
    let config = ContextConfig::new("local-fs")
        .with_default_parallelism(2)
        .with_max_concurrency(2);
    let context = FlowContext::with_config(config, store.clone()).unwrap();

    let words = context
        .text_file("input.txt")
        .flat_map(|line: String| {
            line.split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        });
    assert_eq!(words.collect().unwrap(), vec!["one", "two", "three"]);

    words.save_as_text_file("output.txt").unwrap();
    let written = std::fs::read_to_string(dir.path().join("output.txt")).unwrap();
    assert_eq!(written, "one\ntwo\nthree\n");
}
