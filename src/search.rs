use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{Result, ScoopError};
use crate::formats;
use crate::io::ChunkSource;
use crate::matcher::StreamingMatcher;
use crate::types::{FileType, FileTypePart, Match};

/// Called with `(bytes_scanned, total_bytes)` after every chunk.
pub type Progress<'a> = &'a (dyn Fn(u64, u64) + Sync);

/// Builds the header and footer matchers for `types`. A type whose patterns
/// do not compile is skipped with a warning.
pub fn build_matchers(types: &[FileType]) -> Vec<StreamingMatcher> {
    let mut matchers = Vec::with_capacity(types.len() * 2);

    for &file_type in types {
        let sig = formats::signature(file_type);
        let header = StreamingMatcher::new(sig.header, FileTypePart::header(file_type));
        let footer = sig
            .footer
            .map(|pattern| StreamingMatcher::new(pattern, FileTypePart::footer(file_type)))
            .transpose();

        match (header, footer) {
            (Ok(header), Ok(footer)) => {
                matchers.push(header);
                matchers.extend(footer);
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(%file_type, error = %e, "Skipping file type with invalid signature");
            }
        }
    }

    matchers
}

/// Scans the whole source once, sequentially, advancing every matcher over
/// each chunk. Returns all matches sorted by `(start, end, type)`.
pub fn search_phase<S: ChunkSource + ?Sized>(
    source: &mut S,
    chunk_size: usize,
    types: &[FileType],
    progress: Option<Progress<'_>>,
) -> Result<Vec<Match>> {
    if chunk_size == 0 {
        return Err(ScoopError::InvalidChunkSize(chunk_size));
    }

    let mut matchers = build_matchers(types);
    let total = source.size();
    let mut matches = Vec::new();

    source.reset()?;

    if matchers.is_empty() {
        warn!("No usable file types, nothing to search for");
        return Ok(matches);
    }

    let mut buf = vec![0u8; chunk_size];
    let mut offset = 0u64;

    loop {
        let n = source.next_chunk(&mut buf)?;
        if n == 0 {
            break;
        }
        let chunk = &buf[..n];

        let found: Vec<Vec<Match>> = matchers
            .par_iter_mut()
            .map(|m| m.advance(chunk, offset))
            .collect();
        for batch in found {
            matches.extend(batch);
        }

        offset += n as u64;
        if let Some(report) = progress {
            report(offset, total);
        }
    }

    matches.sort_unstable_by_key(|m| (m.start, m.end, m.kind));

    debug!(chunks = offset.div_ceil(chunk_size as u64), "Search pass finished");
    info!(bytes = offset, matches = matches.len(), "Signature search complete");

    Ok(matches)
}
