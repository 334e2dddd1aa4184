use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::Receiver;
use rayon::slice::ParallelSliceMut;
use tracing::info;

use crate::error::Result;
use crate::report::Summary;
use crate::table::{KeyHasher, KeyTable, Stats};
use crate::worker::Batch;

/// Sole owner and writer of the key table.
pub struct Aggregator {
    table: KeyTable,
    keys: Vec<Arc<[u8]>>,
}

impl Aggregator {
    pub fn new(capacity: usize, hasher: KeyHasher) -> Result<Self> {
        Ok(Self {
            table: KeyTable::with_capacity(capacity, hasher)?,
            keys: Vec::new(),
        })
    }

    #[cfg(test)]
    pub(crate) fn hasher(&self) -> &KeyHasher {
        self.table.hasher()
    }

    #[inline]
    pub fn fold(&mut self, hash: u64, key: &[u8], value: i64) -> Result<()> {
        if let Some(stats) = self.table.lookup_mut(hash, key) {
            stats.record(value);
            return Ok(());
        }
        let key: Arc<[u8]> = Arc::from(key);
        self.table.insert(hash, Arc::clone(&key), Stats::new(value))?;
        self.keys.push(key);
        Ok(())
    }

    pub fn fold_batch(&mut self, batch: &Batch) -> Result<()> {
        for reading in batch.readings() {
            self.fold(reading.hash, reading.key, reading.value)?;
        }
        Ok(())
    }

    /// Folds batches until every sender is gone. Returns on the first error,
    /// dropping the receiver so upstream stages see the queue close.
    pub fn drain(&mut self, batches: Receiver<Result<Batch>>) -> Result<()> {
        for batch in batches {
            self.fold_batch(&batch?)?;
        }
        Ok(())
    }

    pub fn distinct_keys(&self) -> usize {
        self.keys.len()
    }

    /// Sorts the observed keys bytewise and hands the table over for output.
    pub fn finish(mut self) -> Summary {
        let started = Instant::now();
        self.keys.par_sort_unstable();
        info!(keys = self.keys.len(), elapsed = ?started.elapsed(), "sort finished");
        Summary::new(self.table, self.keys)
    }
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::unbounded;

    use super::*;
    use crate::error::Error;

    fn aggregator(capacity: usize) -> Aggregator {
        Aggregator::new(capacity, KeyHasher::default()).unwrap()
    }

    fn fold_all(agg: &mut Aggregator, records: &[(&str, i64)]) -> Result<()> {
        for &(key, value) in records {
            let key = key.as_bytes();
            let hash = agg.hasher().hash(key);
            agg.fold(hash, key, value)?;
        }
        Ok(())
    }

    #[test]
    fn first_observation_seeds_stats() {
        let mut agg = aggregator(16);
        fold_all(&mut agg, &[("A", 10), ("B", -25), ("A", 30)]).unwrap();
        assert_eq!(agg.distinct_keys(), 2);

        let summary = agg.finish();
        assert_eq!(
            summary.get(b"A"),
            Some(&Stats { min: 10, max: 30, sum: 40, count: 2 })
        );
        assert_eq!(summary.get(b"B"), Some(&Stats::new(-25)));
    }

    #[test]
    fn fold_order_does_not_matter() {
        let records = [("x", 5), ("y", -3), ("x", -40), ("z", 0), ("y", 17), ("x", 99)];
        let mut forward = aggregator(8);
        fold_all(&mut forward, &records).unwrap();
        let mut reversed = aggregator(8);
        let backwards: Vec<_> = records.iter().rev().copied().collect();
        fold_all(&mut reversed, &backwards).unwrap();

        assert_eq!(forward.finish().render(), reversed.finish().render());
    }

    #[test]
    fn too_many_keys_is_a_capacity_error() {
        let mut agg = aggregator(2);
        let err = fold_all(&mut agg, &[("a", 1), ("b", 1), ("a", 2), ("c", 1)]).unwrap_err();
        assert!(matches!(err, Error::Capacity { capacity: 2 }));
    }

    #[test]
    fn drain_stops_on_forwarded_error() {
        let hasher = KeyHasher::default();
        let mut agg = Aggregator::new(8, hasher.clone()).unwrap();
        let (tx, rx) = unbounded();
        tx.send(Batch::parse(b"a;1.0\n".to_vec(), &hasher)).unwrap();
        tx.send(Batch::parse(b"oops\n".to_vec(), &hasher)).unwrap();
        tx.send(Batch::parse(b"b;1.0\n".to_vec(), &hasher)).unwrap();
        drop(tx);

        assert!(matches!(agg.drain(rx), Err(Error::MalformedRecord { .. })));
        assert_eq!(agg.distinct_keys(), 1);
    }
}
