use crate::error::{Error, Result};

pub const DEFAULT_BLOCK_SIZE: usize = 32 * 1024 * 1024;
pub const DEFAULT_WORKERS: usize = 12;
/// Must stay well above the number of distinct keys in the input.
pub const DEFAULT_TABLE_CAPACITY: usize = 1 << 17;
pub const DEFAULT_CHUNK_QUEUE_DEPTH: usize = 4;
/// Batches own their chunk, so this queue is sized like the worker pool.
pub const DEFAULT_BATCH_QUEUE_DEPTH: usize = DEFAULT_WORKERS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Bytes requested from the source per read.
    pub block_size: usize,
    /// Number of parse workers.
    pub workers: usize,
    /// Key table slots; a power of two.
    pub table_capacity: usize,
    /// Raw chunks allowed in flight between the reader and the workers.
    pub chunk_queue_depth: usize,
    /// Parsed batches allowed in flight between the workers and the aggregator.
    pub batch_queue_depth: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            workers: DEFAULT_WORKERS,
            table_capacity: DEFAULT_TABLE_CAPACITY,
            chunk_queue_depth: DEFAULT_CHUNK_QUEUE_DEPTH,
            batch_queue_depth: DEFAULT_BATCH_QUEUE_DEPTH,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("block_size", self.block_size),
            ("workers", self.workers),
            ("chunk_queue_depth", self.chunk_queue_depth),
            ("batch_queue_depth", self.batch_queue_depth),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{name} must be greater than zero")));
            }
        }
        if !self.table_capacity.is_power_of_two() {
            return Err(Error::Config(format!(
                "table_capacity {} is not a power of two",
                self.table_capacity
            )));
        }
        Ok(())
    }

    /// Upper bound on raw input held in memory at once: the reader's block
    /// and the chunk it is sending, both queues full, one chunk per worker
    /// and the batch the aggregator is folding. Carries make a chunk exceed
    /// `block_size` by at most one partial record.
    pub fn max_buffered_blocks(&self) -> usize {
        2 + self.chunk_queue_depth + self.workers + self.batch_queue_depth + 1
    }

    pub fn max_buffered_bytes(&self) -> usize {
        self.max_buffered_blocks().saturating_mul(self.block_size)
    }
}
