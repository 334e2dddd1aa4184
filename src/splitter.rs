use memchr::memrchr;

pub const TERMINATOR: u8 = b'\n';

/// Cuts raw blocks at the last record terminator, holding back the partial
/// record that follows it until the next block completes it.
#[derive(Debug, Default)]
pub struct ChunkSplitter {
    carry: Vec<u8>,
}

impl ChunkSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `carry + block[..=last_terminator]`, keeping the rest of the
    /// block as the new carry. A block without any terminator is absorbed
    /// into the carry entirely and yields `None`.
    pub fn split(&mut self, block: &[u8]) -> Option<Vec<u8>> {
        let Some(last) = memrchr(TERMINATOR, block) else {
            self.carry.extend_from_slice(block);
            return None;
        };
        let (complete, rest) = block.split_at(last + 1);

        let mut chunk = Vec::with_capacity(self.carry.len() + complete.len());
        chunk.extend_from_slice(&self.carry);
        chunk.extend_from_slice(complete);

        self.carry.clear();
        self.carry.extend_from_slice(rest);
        Some(chunk)
    }

    #[cfg(test)]
    pub(crate) fn carry(&self) -> &[u8] {
        &self.carry
    }

    /// Hands back whatever followed the final terminator of the stream.
    pub fn finish(self) -> Vec<u8> {
        self.carry
    }
}
