use std::io;

use crate::io::ChunkSource;
use crate::types::Offset;

/// Two-chunk sliding window over the input. The upper half holds the current
/// chunk; the lower half holds the previous chunk when it was kept.
pub struct CarveBuffer {
    data: Vec<u8>,
    chunk_size: usize,
    current: Option<(u64, usize)>,
    previous: Option<(u64, usize)>,
}

impl CarveBuffer {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            data: vec![0u8; chunk_size * 2],
            chunk_size,
            current: None,
            previous: None,
        }
    }

    /// Loads chunk `index` into the upper half. With `keep_previous`, the
    /// chunk currently loaded moves to the lower half first; it must be the
    /// immediately preceding chunk.
    pub fn load<S: ChunkSource + ?Sized>(
        &mut self,
        source: &mut S,
        index: u64,
        keep_previous: bool,
    ) -> io::Result<()> {
        let cs = self.chunk_size;
        self.previous = match self.current {
            Some((prev, len)) if keep_previous && prev + 1 == index => {
                self.data.copy_within(cs..cs + len, 0);
                Some((prev, len))
            }
            _ => None,
        };

        let n = source.read_at(index * cs as u64, &mut self.data[cs..])?;
        self.current = Some((index, n));
        Ok(())
    }

    #[inline]
    fn current_bounds(&self) -> (Offset, Offset) {
        let (index, len) = self.current.expect("no chunk loaded");
        let start = index * self.chunk_size as u64;
        (start, start + len as u64)
    }

    /// Bytes of `[start, stop)` that fall inside the current chunk.
    pub fn fetch(&self, start: Offset, stop: Offset) -> &[u8] {
        let (lo, hi) = self.current_bounds();
        let from = start.clamp(lo, hi);
        let to = stop.clamp(from, hi);
        let base = self.chunk_size as u64 + (from - lo);
        &self.data[base as usize..(base + (to - from)) as usize]
    }

    /// Bytes of `[start, stop)` spanning the previous and current chunks.
    pub fn get_with_last(&self, start: Offset, stop: Offset) -> &[u8] {
        let (prev, prev_len) = self.previous.expect("previous chunk was not kept");
        assert_eq!(prev_len, self.chunk_size, "kept chunk must be full");

        let lo = prev * self.chunk_size as u64;
        let (_, hi) = self.current_bounds();
        let from = start.clamp(lo, hi);
        let to = stop.clamp(from, hi);
        &self.data[(from - lo) as usize..(to - lo) as usize]
    }
}
