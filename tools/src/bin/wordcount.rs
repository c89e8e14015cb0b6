//! Count the words of a text file.

use anyhow::{Context, Result};
use clap::Parser;
use sparklet_common::{StorageBackend, StorageBuilder};
use sparklet_core::FlowContext;
use sparklet_tools::{top_words, word_counts, wordcount_config};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sparklet-wordcount", about = "Count the words of a text file")]
struct Cli {
    /// Input text file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Write `word,count` lines to this file, relative to the input's directory
    #[arg(long)]
    output: Option<String>,

    /// Number of input partitions (defaults to the context parallelism)
    #[arg(long)]
    partitions: Option<usize>,

    /// Worker threads
    #[arg(long)]
    threads: Option<usize>,

    /// Number of words to print
    #[arg(long, default_value_t = 10)]
    top: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let input = cli
        .input
        .canonicalize()
        .with_context(|| format!("cannot resolve {}", cli.input.display()))?;
    let root = input
        .parent()
        .context("input has no parent directory")?
        .to_string_lossy()
        .into_owned();
    let file_name = input
        .file_name()
        .context("input is not a file")?
        .to_string_lossy()
        .into_owned();

    let store = StorageBuilder::new()
        .backend(StorageBackend::LocalFileSystem { root_path: root })
        .build()?;
    let mut config = wordcount_config(|key| std::env::var(key).ok())?;
    if let Some(threads) = cli.threads {
        config = config.with_max_concurrency(threads);
    }
    let context = FlowContext::with_config(config, store)?;

    let counts = word_counts(&context, &file_name, cli.partitions);
    for (word, count) in top_words(&counts, cli.top)? {
        println!("{count:>8} {word}");
    }

    if let Some(output) = cli.output {
        counts
            .map(|(word, count)| format!("{word},{count}"))
            .save_as_text_file(&output)?;
        info!(output = %output, "saved word counts");
    }

    if let Some(summary) = context.last_job_summary() {
        info!(
            job_id = summary.job_id,
            partitions_computed = summary.partitions_computed,
            "last job"
        );
    }
    context.stop();
    Ok(())
}
