//! Sparklet Tools - driver programs built on the Sparklet engine
//!
//! The word-count pipeline lives here so the binary stays a thin CLI.

use sparklet_core::context::ENV_APP_NAME;
use sparklet_core::{ContextConfig, DistributedRdd, FlowContext, PairRddExt, RddResult};

/// Application name used when `SPARKLET_APP_NAME` is unset.
pub const DEFAULT_APP_NAME: &str = "sparklet-wordcount";

/// Context configuration from `lookup`, named [`DEFAULT_APP_NAME`] unless
/// `SPARKLET_APP_NAME` says otherwise.
pub fn wordcount_config(lookup: impl Fn(&str) -> Option<String>) -> RddResult<ContextConfig> {
    ContextConfig::from_lookup(|key| {
        lookup(key).or_else(|| (key == ENV_APP_NAME).then(|| DEFAULT_APP_NAME.to_string()))
    })
}

/// `text_file -> flat_map(split) -> map((w, 1)) -> reduce_by_key(+)`.
pub fn word_counts(
    context: &FlowContext,
    path: &str,
    partitions: Option<usize>,
) -> DistributedRdd<(String, u64)> {
    let lines = match partitions {
        Some(n) => context.text_file_with_partitions(path, n),
        None => context.text_file(path),
    };
    lines
        .flat_map(|line: String| {
            line.split_whitespace()
                .map(|w| w.to_lowercase())
                .collect::<Vec<_>>()
        })
        .map(|word| (word, 1u64))
        .reduce_by_key(|a, b| a + b)
}

/// The `n` most frequent words, ties broken alphabetically.
pub fn top_words(
    counts: &DistributedRdd<(String, u64)>,
    n: usize,
) -> RddResult<Vec<(String, u64)>> {
    let mut all = counts.collect()?;
    all.sort_by(|(wa, ca), (wb, cb)| cb.cmp(ca).then_with(|| wa.cmp(wb)));
    all.truncate(n);
    Ok(all)
}
