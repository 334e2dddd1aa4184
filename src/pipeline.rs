//! Reader, parse workers and aggregator wired together with two bounded
//! queues:
//!
//! ```text
//! reader --chunks--> worker 0..N --batches--> aggregator (owns KeyTable)
//! ```
//!
//! Shutdown follows sender ownership. The reader holds the only chunk
//! sender, so the ingestion queue closes when it returns. Each worker holds a
//! batch sender, so the aggregation queue closes once the last worker exits,
//! and only then does the aggregator's drain loop end.

use std::io::Read;
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::Instant;

use crossbeam_channel::bounded;
use tracing::{debug, info};

use crate::aggregator::Aggregator;
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::reader::BlockReader;
use crate::report::Summary;
use crate::table::KeyHasher;
use crate::worker::{self, Batch};

/// Aggregates every record of `source` and returns the sorted summary.
///
/// Any malformed record, read failure or table overflow aborts the whole
/// run; no partial summary is produced.
pub fn run<R: Read + Send>(source: R, config: &PipelineConfig) -> Result<Summary> {
    config.validate()?;
    let started = Instant::now();
    debug!(
        workers = config.workers,
        max_buffered_bytes = config.max_buffered_bytes(),
        "starting pipeline"
    );

    let hasher = KeyHasher::default();
    let mut aggregator = Aggregator::new(config.table_capacity, hasher.clone())?;

    let (chunk_tx, chunk_rx) = bounded::<Vec<u8>>(config.chunk_queue_depth);
    let (batch_tx, batch_rx) = bounded::<Result<Batch>>(config.batch_queue_depth);

    let (folded, read) = thread::scope(|s| -> Result<_> {
        let block_size = config.block_size;
        let reader = spawn_stage(s, "reader".to_owned(), move || {
            BlockReader::new(source, block_size).run(chunk_tx)
        })?;

        let mut workers = Vec::with_capacity(config.workers);
        for id in 0..config.workers {
            let chunks = chunk_rx.clone();
            let batches = batch_tx.clone();
            let hasher = hasher.clone();
            let name = format!("parser-{id}");
            let handle = spawn_stage(s, name.clone(), move || {
                worker::run(id, chunks, batches, hasher)
            })?;
            workers.push((name, handle));
        }
        // Only the stage threads may keep the queues open.
        drop(chunk_rx);
        drop(batch_tx);

        let folded = aggregator.drain(batch_rx);

        for (name, handle) in workers {
            join_stage(name, handle)?;
        }
        let read = join_stage("reader".to_owned(), reader)?;
        Ok((folded, read))
    })?;

    folded?;
    let read = read?;
    info!(
        bytes = read.bytes,
        keys = aggregator.distinct_keys(),
        elapsed = ?started.elapsed(),
        "scan finished"
    );
    debug!(blocks = read.blocks, chunks = read.chunks, "ingestion totals");

    Ok(aggregator.finish())
}

fn spawn_stage<'scope, 'env, T, F>(
    scope: &'scope Scope<'scope, 'env>,
    name: String,
    f: F,
) -> Result<ScopedJoinHandle<'scope, T>>
where
    T: Send + 'scope,
    F: FnOnce() -> T + Send + 'scope,
{
    Ok(thread::Builder::new().name(name).spawn_scoped(scope, f)?)
}

fn join_stage<T>(name: String, handle: ScopedJoinHandle<'_, T>) -> Result<T> {
    handle.join().map_err(|_| Error::StagePanicked { stage: name })
}
