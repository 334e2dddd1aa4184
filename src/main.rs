use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use memmap2::Mmap;
use tracing::info;
use tracing_subscriber::EnvFilter;

use one_brc_pipeline::config::{
    DEFAULT_BLOCK_SIZE, DEFAULT_CHUNK_QUEUE_DEPTH, DEFAULT_TABLE_CAPACITY, DEFAULT_WORKERS,
};
use one_brc_pipeline::PipelineConfig;

#[derive(Debug, Parser)]
#[command(version, about = "Per-key min/mean/max over `<key>;<value>` lines")]
struct Args {
    /// Input file of `<key>;<value>` records.
    #[arg(default_value = "measurements.txt")]
    path: PathBuf,

    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,

    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Key table slots (power of two, above the distinct key count).
    #[arg(long, default_value_t = DEFAULT_TABLE_CAPACITY)]
    table_capacity: usize,

    #[arg(long, default_value_t = DEFAULT_CHUNK_QUEUE_DEPTH)]
    chunk_queue_depth: usize,

    /// Defaults to the worker count.
    #[arg(long)]
    batch_queue_depth: Option<usize>,

    /// Read through a memory map instead of buffered file reads.
    #[arg(long)]
    mmap: bool,
}

impl Args {
    fn config(&self) -> PipelineConfig {
        PipelineConfig {
            block_size: self.block_size,
            workers: self.workers,
            table_capacity: self.table_capacity,
            chunk_queue_depth: self.chunk_queue_depth,
            batch_queue_depth: self.batch_queue_depth.unwrap_or(self.workers),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = args.config();

    let file = File::open(&args.path)
        .with_context(|| format!("failed to open {}", args.path.display()))?;
    let result = if args.mmap {
        // SAFETY: the mapping is read-only and the file is not expected to
        // change while the pipeline runs.
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("failed to map {}", args.path.display()))?;
        one_brc_pipeline::run(&mmap[..], &config)
    } else {
        one_brc_pipeline::run(file, &config)
    };
    let summary =
        result.with_context(|| format!("failed to aggregate {}", args.path.display()))?;

    let started = Instant::now();
    let mut out = BufWriter::new(io::stdout().lock());
    summary.write_to(&mut out)?;
    out.flush()?;
    info!(elapsed = ?started.elapsed(), "print finished");

    Ok(())
}
