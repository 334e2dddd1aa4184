//! Fixed-capacity open-addressing table keyed by raw key bytes.
//!
//! Slots are probed linearly from `hash & mask`, wrapping at the end. The
//! table never grows: once `len == capacity` a new key is refused with
//! [`Error::Capacity`], and every probe is bounded by the capacity so a full
//! table cannot spin.

use std::sync::Arc;

use ahash::RandomState;

use crate::error::{Error, Result};

/// Running min/max/sum/count of a key's values, all in tenths.
///
/// `sum` is 128-bit: even at the largest accepted value it cannot overflow
/// before `count` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub min: i64,
    pub max: i64,
    pub sum: i128,
    pub count: u64,
}

impl Stats {
    pub fn new(value: i64) -> Self {
        Self {
            min: value,
            max: value,
            sum: i128::from(value),
            count: 1,
        }
    }

    #[inline]
    pub fn record(&mut self, value: i64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += i128::from(value);
        self.count += 1;
    }

    #[cfg(test)]
    pub(crate) fn merge(&mut self, other: &Stats) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        self.count += other.count;
    }

    /// Mean in tenths, rounded half away from zero. Computed in integers so
    /// it stays exact and within `min..=max` at any magnitude.
    pub fn mean_tenths(&self) -> i64 {
        let count = i128::from(self.count);
        let mean = (2 * self.sum + self.sum.signum() * count) / (2 * count);
        // A mean lies between min and max, both of which are i64.
        mean as i64
    }
}

/// Hashes keys identically in every worker and in the table.
#[derive(Clone)]
pub struct KeyHasher(RandomState);

impl Default for KeyHasher {
    fn default() -> Self {
        Self(RandomState::with_seeds(
            0x243f_6a88_85a3_08d3,
            0x1319_8a2e_0370_7344,
            0xa409_3822_299f_31d0,
            0x082e_fa98_ec4e_6c89,
        ))
    }
}

impl KeyHasher {
    #[inline]
    pub fn hash(&self, key: &[u8]) -> u64 {
        self.0.hash_one(key)
    }
}

struct Entry {
    key: Arc<[u8]>,
    stats: Stats,
}

pub struct KeyTable {
    slots: Box<[Option<Entry>]>,
    mask: usize,
    len: usize,
    hasher: KeyHasher,
}

impl KeyTable {
    /// `capacity` must be a non-zero power of two and should comfortably
    /// exceed the number of distinct keys expected.
    pub fn with_capacity(capacity: usize, hasher: KeyHasher) -> Result<Self> {
        if !capacity.is_power_of_two() {
            return Err(Error::Config(format!(
                "table capacity {capacity} is not a power of two"
            )));
        }
        let slots = std::iter::repeat_with(|| None).take(capacity).collect();
        Ok(Self {
            slots,
            mask: capacity - 1,
            len: 0,
            hasher,
        })
    }

    pub fn hasher(&self) -> &KeyHasher {
        &self.hasher
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Occupies the first free slot at or after `hash`. Does not look for an
    /// existing entry with the same key; callers insert only after a missed
    /// lookup.
    pub fn insert(&mut self, hash: u64, key: Arc<[u8]>, stats: Stats) -> Result<()> {
        if self.len == self.slots.len() {
            return Err(Error::Capacity {
                capacity: self.slots.len(),
            });
        }
        let mut idx = hash as usize & self.mask;
        while self.slots[idx].is_some() {
            idx = (idx + 1) & self.mask;
        }
        self.slots[idx] = Some(Entry { key, stats });
        self.len += 1;
        Ok(())
    }

    pub fn lookup(&self, hash: u64, key: &[u8]) -> Option<&Stats> {
        self.find(hash, key)
            .and_then(|idx| self.slots[idx].as_ref())
            .map(|entry| &entry.stats)
    }

    pub fn lookup_mut(&mut self, hash: u64, key: &[u8]) -> Option<&mut Stats> {
        self.find(hash, key)
            .and_then(|idx| self.slots[idx].as_mut())
            .map(|entry| &mut entry.stats)
    }

    #[inline]
    fn find(&self, hash: u64, key: &[u8]) -> Option<usize> {
        let mut idx = hash as usize & self.mask;
        for _ in 0..self.slots.len() {
            match &self.slots[idx] {
                None => return None,
                Some(entry) if *entry.key == *key => return Some(idx),
                Some(_) => idx = (idx + 1) & self.mask,
            }
        }
        None
    }
}
