use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use crate::fixed_point::write_tenths;
use crate::table::{KeyTable, Stats};

/// Final per-key statistics in ascending bytewise key order.
pub struct Summary {
    table: KeyTable,
    keys: Vec<Arc<[u8]>>,
}

impl Summary {
    /// `keys` must already be sorted and each must be present in `table`.
    pub(crate) fn new(table: KeyTable, keys: Vec<Arc<[u8]>>) -> Self {
        Self { table, keys }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, key: &[u8]) -> Option<&Stats> {
        self.table.lookup(self.table.hasher().hash(key), key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Stats)> + '_ {
        self.keys
            .iter()
            .filter_map(move |key| self.get(key).map(|stats| (&key[..], stats)))
    }

    /// `{k1=min/mean/max, k2=...}` without a trailing newline.
    pub fn render(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.keys.len() * 32);
        out.push(b'{');
        for (i, (key, stats)) in self.iter().enumerate() {
            if i > 0 {
                out.extend_from_slice(b", ");
            }
            out.extend_from_slice(key);
            out.push(b'=');
            write_tenths(stats.min, &mut out);
            out.push(b'/');
            let mean = stats.mean_tenths();
            if mean == 0 && stats.sum < 0 {
                // A negative mean that rounds to zero keeps its sign.
                out.push(b'-');
            }
            write_tenths(mean, &mut out);
            out.push(b'/');
            write_tenths(stats.max, &mut out);
        }
        out.push(b'}');
        out
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.render())?;
        writer.write_all(b"\n")
    }
}

impl fmt::Debug for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(key, stats)| (String::from_utf8_lossy(key), stats)))
            .finish()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.render()))
    }
}
