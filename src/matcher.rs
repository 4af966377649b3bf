use std::sync::Arc;

use crate::error::Result;
use crate::pattern::{self, Edge, Nfa, StateId};
use crate::types::{FileTypePart, Match, Offset};

#[derive(Debug, Clone)]
struct StateInfo {
    edges: Vec<(Edge, StateId)>,
    accepting: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Traversal {
    state: StateId,
    origin: Offset,
}

/// Unanchored search for one compiled pattern over a stream of contiguous
/// chunks.
///
/// The only state carried between [`advance`](Self::advance) calls is the set
/// of in-flight traversals, each remembering the absolute offset where it
/// started. Every start position yields at most one match: the shortest one.
#[derive(Debug, Clone)]
pub struct StreamingMatcher {
    nfa: Arc<Nfa>,
    kind: FileTypePart,
    table: Vec<StateInfo>,
    traversals: Vec<Traversal>,
    next_offset: Option<Offset>,
}

impl StreamingMatcher {
    pub fn new(pattern: &str, kind: FileTypePart) -> Result<Self> {
        Ok(Self::from_nfa(pattern::compile(pattern)?, kind))
    }

    pub fn from_nfa(nfa: Arc<Nfa>, kind: FileTypePart) -> Self {
        let table = nfa
            .state_ids()
            .map(|id| StateInfo {
                edges: nfa
                    .flatten(id)
                    .into_iter()
                    .map(|t| (t.edge, t.target))
                    .collect(),
                accepting: nfa.is_accepting(id),
            })
            .collect();

        Self {
            nfa,
            kind,
            table,
            traversals: Vec::new(),
            next_offset: None,
        }
    }

    #[inline]
    pub fn kind(&self) -> FileTypePart {
        self.kind
    }

    #[inline]
    pub fn in_flight(&self) -> usize {
        self.traversals.len()
    }

    pub fn reset(&mut self) {
        self.traversals.clear();
        self.next_offset = None;
    }

    /// Feeds the next chunk, whose first byte sits at absolute offset `base`,
    /// and returns the matches completed inside it in order of their end.
    pub fn advance(&mut self, bytes: &[u8], base: Offset) -> Vec<Match> {
        debug_assert!(
            self.next_offset.is_none_or(|expected| expected == base),
            "chunks must be fed contiguously"
        );

        let start = self.nfa.start();
        let start_accepting = self.table[start.index()].accepting;
        let mut matches = Vec::new();
        let mut next: Vec<Traversal> = Vec::with_capacity(self.traversals.len() + 1);
        let mut emitted: Vec<Offset> = Vec::new();

        for (i, &byte) in bytes.iter().enumerate() {
            let pos = base + i as u64;
            next.clear();
            emitted.clear();

            for t in &self.traversals {
                for &(edge, target) in &self.table[t.state.index()].edges {
                    if !edge.accepts(byte) {
                        continue;
                    }
                    if self.table[target.index()].accepting {
                        if !emitted.contains(&t.origin) {
                            emitted.push(t.origin);
                        }
                    } else {
                        next.push(Traversal {
                            state: target,
                            origin: t.origin,
                        });
                    }
                }
            }

            if start_accepting {
                emitted.push(pos);
            } else {
                for &(edge, target) in &self.table[start.index()].edges {
                    if !edge.accepts(byte) {
                        continue;
                    }
                    if self.table[target.index()].accepting {
                        if !emitted.contains(&pos) {
                            emitted.push(pos);
                        }
                    } else {
                        next.push(Traversal {
                            state: target,
                            origin: pos,
                        });
                    }
                }
            }

            if !emitted.is_empty() {
                emitted.sort_unstable();
                next.retain(|t| !emitted.contains(&t.origin));
                matches.extend(emitted.iter().map(|&origin| Match::new(origin, pos, self.kind)));
            }

            next.sort_unstable();
            next.dedup();
            std::mem::swap(&mut self.traversals, &mut next);
        }

        self.next_offset = Some(base + bytes.len() as u64);
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileType;

    fn matcher(pattern: &str) -> StreamingMatcher {
        StreamingMatcher::new(pattern, FileTypePart::header(FileType::Jpg)).unwrap()
    }

    fn spans(matches: &[Match]) -> Vec<(u64, u64)> {
        matches.iter().map(|m| (m.start, m.end)).collect()
    }

    #[test]
    fn test_two_byte_literal() {
        let mut m = matcher(r"\x0a\x0b");
        let found = m.advance(&[0x0a, 0x0b], 0);
        assert_eq!(spans(&found), vec![(0, 1)]);
        assert_eq!(found[0].kind, FileTypePart::header(FileType::Jpg));
    }

    #[test]
    fn test_split_across_chunks() {
        let mut m = matcher(r"\x0a\x0b");
        assert!(m.advance(&[0x0a], 0).is_empty());
        assert_eq!(m.in_flight(), 1);
        assert_eq!(spans(&m.advance(&[0x0b], 1)), vec![(0, 1)]);
        assert_eq!(m.in_flight(), 0);
    }

    #[test]
    fn test_unanchored_search() {
        let mut m = matcher("abc");
        let found = m.advance(b"xxabcxabcab", 100);
        assert_eq!(spans(&found), vec![(102, 104), (106, 108)]);
    }

    #[test]
    fn test_overlapping_starts() {
        let mut m = matcher("aa");
        assert_eq!(spans(&m.advance(b"aaa", 0)), vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn test_single_byte_pattern() {
        let mut m = matcher(r"\xFF");
        assert_eq!(spans(&m.advance(&[0, 0xFF, 0], 0)), vec![(1, 1)]);
    }

    #[test]
    fn test_shortest_accept_per_start() {
        let mut m = matcher("ab+");
        assert_eq!(spans(&m.advance(b"abbb", 0)), vec![(0, 1)]);
    }

    #[test]
    fn test_alternatives_fork() {
        let mut m = matcher("a(bc|bd)");
        assert_eq!(spans(&m.advance(b"abd", 0)), vec![(0, 2)]);
    }

    #[test]
    fn test_wildcard_run() {
        let mut m = matcher("RIFF....WAVE");
        let mut data = vec![0u8; 3];
        data.extend_from_slice(b"RIFF\x24\x08\x00\x00WAVEfmt ");
        assert_eq!(spans(&m.advance(&data, 0)), vec![(3, 14)]);
    }

    #[test]
    fn test_zero_length_pattern() {
        let mut m = matcher("a?");
        assert_eq!(spans(&m.advance(b"xy", 5)), vec![(5, 5), (6, 6)]);
    }

    #[test]
    fn test_reset_drops_partial_traversals() {
        let mut m = matcher("abc");
        m.advance(b"ab", 0);
        m.reset();
        assert!(m.advance(b"c", 0).is_empty());
    }
}
