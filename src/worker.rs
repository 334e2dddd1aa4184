use crossbeam_channel::{Receiver, Sender};
use memchr::{memchr_iter, memrchr};
use tracing::debug;

use crate::error::{Error, Result};
use crate::fixed_point::parse_tenths;
use crate::splitter::TERMINATOR;
use crate::table::KeyHasher;

pub const DELIMITER: u8 = b';';

/// One parsed record, borrowing its key from the batch that owns the chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading<'a> {
    pub key: &'a [u8],
    pub hash: u64,
    pub value: i64,
}

#[derive(Debug, Clone, Copy)]
struct Parsed {
    key_start: usize,
    key_end: usize,
    hash: u64,
    value: i64,
}

/// Every reading of one chunk. The chunk bytes travel with the readings so
/// keys are never copied until the aggregator stores a new one.
#[derive(Debug)]
pub struct Batch {
    chunk: Vec<u8>,
    parsed: Vec<Parsed>,
}

impl Batch {
    pub fn parse(chunk: Vec<u8>, hasher: &KeyHasher) -> Result<Self> {
        let mut parsed = Vec::with_capacity(chunk.len() / 16);
        let mut start = 0;
        for end in memchr_iter(TERMINATOR, &chunk) {
            parsed.push(parse_record(&chunk, start, end, hasher)?);
            start = end + 1;
        }
        if start < chunk.len() {
            parsed.push(parse_record(&chunk, start, chunk.len(), hasher)?);
        }
        Ok(Self { chunk, parsed })
    }

    pub fn len(&self) -> usize {
        self.parsed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsed.is_empty()
    }

    pub fn readings(&self) -> impl Iterator<Item = Reading<'_>> + '_ {
        self.parsed.iter().map(move |p| Reading {
            key: &self.chunk[p.key_start..p.key_end],
            hash: p.hash,
            value: p.value,
        })
    }
}

#[inline]
fn parse_record(chunk: &[u8], start: usize, end: usize, hasher: &KeyHasher) -> Result<Parsed> {
    let line = &chunk[start..end];
    // The value never contains the delimiter, so the last one splits the
    // record regardless of how many digits the value has.
    let delim = memrchr(DELIMITER, line).ok_or_else(|| Error::malformed(line, "missing delimiter"))?;
    if delim == 0 {
        return Err(Error::malformed(line, "empty key"));
    }
    let value = parse_tenths(&line[delim + 1..])
        .ok_or_else(|| Error::malformed(line, "value is not shaped -?digits.digit"))?;
    let key = &line[..delim];
    Ok(Parsed {
        key_start: start,
        key_end: start + delim,
        hash: hasher.hash(key),
        value,
    })
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WorkerStats {
    pub chunks: u64,
    pub records: u64,
}

/// Turns chunks into batches until the ingestion queue drains or the
/// aggregator stops listening. A parse failure is forwarded as the worker's
/// last message.
pub fn run(
    id: usize,
    chunks: Receiver<Vec<u8>>,
    batches: Sender<Result<Batch>>,
    hasher: KeyHasher,
) -> WorkerStats {
    let mut stats = WorkerStats::default();
    for chunk in chunks.iter() {
        let batch = Batch::parse(chunk, &hasher);
        let failed = batch.is_err();
        if let Ok(batch) = &batch {
            stats.chunks += 1;
            stats.records += batch.len() as u64;
        }
        if batches.send(batch).is_err() {
            debug!(worker = id, "aggregation queue closed, worker stopping early");
            break;
        }
        if failed {
            break;
        }
    }
    debug!(worker = id, chunks = stats.chunks, records = stats.records, "worker done");
    stats
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::unbounded;

    use super::*;

    fn parse(input: &[u8]) -> Result<Vec<(Vec<u8>, i64)>> {
        let batch = Batch::parse(input.to_vec(), &KeyHasher::default())?;
        Ok(batch.readings().map(|r| (r.key.to_vec(), r.value)).collect())
    }

    #[test]
    fn splits_records_and_values() {
        let readings = parse(b"A;1.0\nB;-2.5\nLong Name;12.3\n").unwrap();
        assert_eq!(
            readings,
            vec![
                (b"A".to_vec(), 10),
                (b"B".to_vec(), -25),
                (b"Long Name".to_vec(), 123),
            ]
        );
    }

    #[test]
    fn accepts_any_value_width() {
        let readings = parse(b"x;0.1\nx;-0.1\nx;99.9\nx;-99.9\nx;1234.5\n").unwrap();
        let values: Vec<i64> = readings.into_iter().map(|(_, v)| v).collect();
        assert_eq!(values, vec![1, -1, 999, -999, 12345]);
    }

    #[test]
    fn unterminated_final_record_is_parsed() {
        assert_eq!(parse(b"a;1.0\nb;2.0").unwrap().len(), 2);
    }

    #[test]
    fn key_may_contain_non_ascii() {
        let readings = parse("Zürich;3.0\n".as_bytes()).unwrap();
        assert_eq!(readings[0].0, "Zürich".as_bytes());
    }

    #[test]
    fn readings_carry_key_hash() {
        let hasher = KeyHasher::default();
        let batch = Batch::parse(b"k;1.0\n".to_vec(), &hasher).unwrap();
        let reading = batch.readings().next().unwrap();
        assert_eq!(reading.hash, hasher.hash(b"k"));
    }

    #[test]
    fn malformed_records_are_errors() {
        for (input, reason) in [
            ("no delimiter\n", "missing delimiter"),
            (";1.0\n", "empty key"),
            ("a;1\n", "value is not shaped -?digits.digit"),
            ("a;1.0\n\n", "missing delimiter"),
            ("a;one\n", "value is not shaped -?digits.digit"),
        ] {
            match parse(input.as_bytes()) {
                Err(Error::MalformedRecord { reason: r, .. }) => assert_eq!(r, reason),
                other => panic!("expected malformed record, got {other:?}"),
            }
        }
    }

    #[test]
    fn worker_forwards_error_and_stops() {
        let (chunk_tx, chunk_rx) = unbounded();
        let (batch_tx, batch_rx) = unbounded();
        chunk_tx.send(b"a;1.0\n".to_vec()).unwrap();
        chunk_tx.send(b"bad\n".to_vec()).unwrap();
        chunk_tx.send(b"c;3.0\n".to_vec()).unwrap();
        drop(chunk_tx);

        let stats = run(0, chunk_rx, batch_tx, KeyHasher::default());
        assert_eq!((stats.chunks, stats.records), (1, 1));

        let results: Vec<_> = batch_rx.iter().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
