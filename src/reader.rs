use std::io::{ErrorKind, Read};

use crossbeam_channel::Sender;
use tracing::debug;

use crate::error::Result;
use crate::splitter::{ChunkSplitter, TERMINATOR};

#[derive(Debug, Default, Clone, Copy)]
pub struct ReadStats {
    pub blocks: u64,
    pub chunks: u64,
    pub bytes: u64,
}

/// Pulls fixed-size blocks from `source` and publishes boundary-safe chunks.
pub struct BlockReader<R> {
    source: R,
    block: Vec<u8>,
    splitter: ChunkSplitter,
}

impl<R: Read> BlockReader<R> {
    pub fn new(source: R, block_size: usize) -> Self {
        Self {
            source,
            block: vec![0; block_size],
            splitter: ChunkSplitter::new(),
        }
    }

    /// Runs to end of stream. Dropping the sender when this returns is what
    /// closes the ingestion queue.
    ///
    /// If every consumer has gone away the reader stops early and returns
    /// `Ok`; whichever stage hung up owns the error.
    pub fn run(mut self, queue: Sender<Vec<u8>>) -> Result<ReadStats> {
        let mut stats = ReadStats::default();
        loop {
            let filled = self.fill_block()?;
            if filled == 0 {
                break;
            }
            stats.blocks += 1;
            stats.bytes += filled as u64;

            if let Some(chunk) = self.splitter.split(&self.block[..filled]) {
                if queue.send(chunk).is_err() {
                    debug!("ingestion queue closed, reader stopping early");
                    return Ok(stats);
                }
                stats.chunks += 1;
            }
            if filled < self.block.len() {
                break;
            }
        }

        let mut tail = self.splitter.finish();
        if !tail.is_empty() {
            tail.push(TERMINATOR);
            if queue.send(tail).is_ok() {
                stats.chunks += 1;
            }
        }
        debug!(blocks = stats.blocks, chunks = stats.chunks, bytes = stats.bytes, "reader done");
        Ok(stats)
    }

    /// Reads until the block is full or the source is exhausted. A short
    /// count therefore always means end of stream.
    fn fill_block(&mut self) -> Result<usize> {
        let mut filled = 0;
        while filled < self.block.len() {
            match self.source.read(&mut self.block[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }
}
