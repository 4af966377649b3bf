use tracing::debug;

use crate::types::{FileType, MatchPair, Offset, DEFAULT_CARVE_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkCarveType {
    /// The whole file lies inside this chunk.
    StartStopCarve,
    /// The file starts here and ends in the next chunk.
    StartNextStopCarve,
    /// The file starts here and ends two or more chunks later.
    StartCarve,
    /// The whole chunk is file data.
    ContinueCarve,
    /// The file ends in this chunk.
    StopCarve,
    SkipCarve,
}

pub fn classify(chunk: u64, start_chunk: u64, stop_chunk: u64) -> ChunkCarveType {
    use ChunkCarveType::*;

    if start_chunk == chunk && chunk == stop_chunk {
        StartStopCarve
    } else if start_chunk == chunk && chunk + 1 == stop_chunk {
        StartNextStopCarve
    } else if start_chunk < chunk && chunk < stop_chunk {
        ContinueCarve
    } else if start_chunk == chunk {
        StartCarve
    } else if stop_chunk == chunk {
        StopCarve
    } else {
        SkipCarve
    }
}

/// One piece of work for one file in one chunk. `start` is inclusive and
/// `stop` exclusive, both absolute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkCarveInfo {
    pub start: Offset,
    pub stop: Offset,
    pub carve_type: ChunkCarveType,
    pub file_id: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarveFileInfo {
    pub file_type: FileType,
    /// `{header start}-{footer end or default stop}`, without extension.
    pub filename: String,
    pub start: Offset,
    /// Exclusive, clamped to the end of the input.
    pub stop: Offset,
    pub has_footer: bool,
}

impl CarveFileInfo {
    #[inline]
    pub fn len(&self) -> u64 {
        self.stop - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stop == self.start
    }
}

/// Chunk-indexed work lists for the carve pass.
#[derive(Debug, Clone, Default)]
pub struct CarvePlan {
    chunk_size: u64,
    chunks: Vec<Vec<ChunkCarveInfo>>,
    files: Vec<CarveFileInfo>,
}

impl CarvePlan {
    /// `file_id` of each candidate is its index in `pairs`.
    pub fn build(pairs: &[MatchPair], chunk_size: usize, total_len: u64) -> Self {
        assert!(chunk_size > 0, "chunk size must be non-zero");

        let chunk_size = chunk_size as u64;
        let mut plan = Self {
            chunk_size,
            chunks: Vec::new(),
            files: Vec::with_capacity(pairs.len()),
        };

        for (file_id, (header, footer)) in pairs.iter().enumerate() {
            let named_stop = footer.map_or(header.start + DEFAULT_CARVE_SIZE, |f| f.end);
            let last = footer
                .map_or(header.start + DEFAULT_CARVE_SIZE - 1, |f| f.end)
                .min(total_len.saturating_sub(1));
            assert!(last >= header.start, "carve range ends before it starts");

            let file = CarveFileInfo {
                file_type: header.file_type(),
                filename: format!("{}-{}", header.start, named_stop),
                start: header.start,
                stop: last + 1,
                has_footer: footer.is_some(),
            };
            plan.insert(file_id, &file);
            plan.files.push(file);
        }

        debug!(
            files = plan.files.len(),
            chunks = plan.chunks.len(),
            "Built carve plan"
        );
        plan
    }

    fn insert(&mut self, file_id: usize, file: &CarveFileInfo) {
        let cs = self.chunk_size;
        let start_chunk = file.start / cs;
        let stop_chunk = (file.stop - 1) / cs;

        if self.chunks.len() <= stop_chunk as usize {
            self.chunks.resize_with(stop_chunk as usize + 1, Vec::new);
        }

        for chunk in start_chunk..=stop_chunk {
            let chunk_start = chunk * cs;
            let chunk_end = chunk_start + cs;
            let carve_type = classify(chunk, start_chunk, stop_chunk);

            let (start, stop) = match carve_type {
                ChunkCarveType::StartStopCarve => (file.start, file.stop),
                ChunkCarveType::StartNextStopCarve | ChunkCarveType::StartCarve => {
                    (file.start, chunk_end)
                }
                ChunkCarveType::ContinueCarve => (chunk_start, chunk_end),
                ChunkCarveType::StopCarve => (chunk_start, file.stop),
                ChunkCarveType::SkipCarve => unreachable!("chunk inside its own file range"),
            };

            let item = ChunkCarveInfo {
                start,
                stop,
                carve_type,
                file_id,
            };
            let list = &mut self.chunks[chunk as usize];
            if carve_type == ChunkCarveType::ContinueCarve {
                list.insert(0, item);
            } else {
                list.push(item);
            }
        }
    }

    #[inline]
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Highest chunk index any file touches, or `None` for an empty plan.
    #[inline]
    pub fn last_important_chunk(&self) -> Option<usize> {
        self.chunks.len().checked_sub(1)
    }

    pub fn work(&self, chunk: usize) -> &[ChunkCarveInfo] {
        self.chunks.get(chunk).map_or(&[], Vec::as_slice)
    }

    pub fn files(&self) -> &[CarveFileInfo] {
        &self.files
    }

    pub fn file(&self, file_id: usize) -> &CarveFileInfo {
        &self.files[file_id]
    }
}
