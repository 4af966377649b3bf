use std::collections::BTreeMap;

use tracing::debug;

use crate::formats::{self, Signature};
use crate::types::{FileType, Match, MatchPair, Offset, PairingStrategy};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PairingStats {
    pub pairs: usize,
    pub unterminated: usize,
    pub superseded: usize,
    pub out_of_window: usize,
    pub orphan_footers: usize,
    pub dropped_unmatched: usize,
}

/// Pairs header matches with footer matches. `matches` must be sorted by
/// start offset. Each returned entry is one candidate file, ordered by header
/// offset.
pub fn pair_matches(matches: &[Match], chunk_size: usize) -> Vec<MatchPair> {
    pair_matches_with_stats(matches, chunk_size).0
}

pub fn pair_matches_with_stats(matches: &[Match], chunk_size: usize) -> (Vec<MatchPair>, PairingStats) {
    debug_assert!(matches.windows(2).all(|w| w[0].start <= w[1].start));

    let window = chunk_size as Offset;
    let mut stats = PairingStats::default();
    let mut pairs: Vec<MatchPair> = Vec::new();
    let mut pending: BTreeMap<FileType, Vec<Match>> = BTreeMap::new();

    for &m in matches {
        let sig = formats::signature(m.file_type());

        if m.is_header() {
            if sig.has_footer() {
                pending.entry(m.file_type()).or_default().push(m);
            } else {
                pairs.push((m, None));
            }
            continue;
        }

        let Some(stack) = pending.get_mut(&m.file_type()) else {
            stats.orphan_footers += 1;
            continue;
        };

        match sig.strategy {
            PairingStrategy::PairNext => pair_next(stack, m, &mut pairs, &mut stats),
            PairingStrategy::PairLast => pair_last(stack, m, window, &mut pairs, &mut stats),
        }
    }

    for (file_type, stack) in pending {
        let Signature { requires_footer, .. } = formats::signature(file_type);
        for header in stack.into_iter().filter(|h| h.is_header()) {
            if requires_footer {
                stats.dropped_unmatched += 1;
            } else {
                pairs.push((header, None));
            }
        }
    }

    pairs.sort_by_key(|(h, f)| (h.start, h.kind, f.map(|f| f.end)));
    stats.pairs = pairs.iter().filter(|(_, f)| f.is_some()).count();
    stats.unterminated = pairs.len() - stats.pairs;

    debug!(
        pairs = stats.pairs,
        unterminated = stats.unterminated,
        superseded = stats.superseded,
        out_of_window = stats.out_of_window,
        orphan_footers = stats.orphan_footers,
        dropped = stats.dropped_unmatched,
        "Paired matches"
    );

    (pairs, stats)
}

/// Closes the most recent header. Headers it superseded are discarded.
fn pair_next(stack: &mut Vec<Match>, footer: Match, pairs: &mut Vec<MatchPair>, stats: &mut PairingStats) {
    while let Some(top) = stack.pop() {
        if !top.is_header() {
            continue;
        }
        pairs.push((top, Some(footer)));

        let superseded = stack.iter().filter(|h| h.is_header()).count();
        if superseded > 0 {
            debug!(
                file_type = %footer.file_type(),
                superseded,
                footer = footer.start,
                "Discarding headers superseded before footer"
            );
        }
        stats.superseded += superseded;
        stack.clear();
        return;
    }
    stats.orphan_footers += 1;
}

/// Closes the most recent header lying within one window of the footer.
/// Headers further away are discarded.
fn pair_last(
    stack: &mut Vec<Match>,
    footer: Match,
    window: Offset,
    pairs: &mut Vec<MatchPair>,
    stats: &mut PairingStats,
) {
    while let Some(top) = stack.pop() {
        if !top.is_header() {
            continue;
        }
        if footer.end.saturating_sub(top.start) <= window {
            pairs.push((top, Some(footer)));
            return;
        }
        stats.out_of_window += 1;
    }
    stats.orphan_footers += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileTypePart;

    fn header(ft: FileType, start: u64, len: u64) -> Match {
        Match::new(start, start + len - 1, FileTypePart::header(ft))
    }

    fn footer(ft: FileType, start: u64, len: u64) -> Match {
        Match::new(start, start + len - 1, FileTypePart::footer(ft))
    }

    #[test]
    fn test_pair_next_discards_superseded_header() {
        let matches = [
            header(FileType::Jpg, 10, 4),
            header(FileType::Jpg, 50, 4),
            footer(FileType::Jpg, 60, 2),
        ];
        let (pairs, stats) = pair_matches_with_stats(&matches, 1000);
        assert_eq!(pairs, vec![(matches[1], Some(matches[2]))]);
        assert_eq!(stats.superseded, 1);
    }

    #[test]
    fn test_orphan_footer_ignored() {
        let matches = [
            footer(FileType::Jpg, 0, 2),
            header(FileType::Jpg, 10, 4),
            footer(FileType::Jpg, 20, 2),
        ];
        let (pairs, stats) = pair_matches_with_stats(&matches, 1000);
        assert_eq!(pairs, vec![(matches[1], Some(matches[2]))]);
        assert_eq!(stats.orphan_footers, 1);
    }

    #[test]
    fn test_unterminated_required_footer_dropped() {
        let matches = [header(FileType::Png, 0, 8)];
        let (pairs, stats) = pair_matches_with_stats(&matches, 1000);
        assert!(pairs.is_empty());
        assert_eq!(stats.dropped_unmatched, 1);
    }

    #[test]
    fn test_unterminated_optional_footer_kept() {
        let matches = [header(FileType::Pdf, 0, 7)];
        assert_eq!(pair_matches(&matches, 1000), vec![(matches[0], None)]);
    }

    #[test]
    fn test_header_only_type_emitted_immediately() {
        let matches = [header(FileType::Bmp, 5, 10), header(FileType::Wav, 40, 12)];
        let pairs = pair_matches(&matches, 1000);
        assert_eq!(pairs, vec![(matches[0], None), (matches[1], None)]);
    }

    #[test]
    fn test_pair_last_window() {
        let matches = [
            header(FileType::Zip, 0, 4),
            header(FileType::Zip, 500, 4),
            footer(FileType::Zip, 580, 22),
        ];
        let pairs = pair_matches(&matches, 100);
        assert_eq!(pairs, vec![(matches[1], Some(matches[2]))]);
    }

    #[test]
    fn test_pair_last_drops_headers_outside_window() {
        let matches = [header(FileType::Zip, 0, 4), footer(FileType::Zip, 500, 22)];
        let (pairs, stats) = pair_matches_with_stats(&matches, 100);
        assert!(pairs.is_empty());
        assert_eq!(stats.out_of_window, 1);
    }

    #[test]
    fn test_pair_last_keeps_older_headers_for_later_footers() {
        let matches = [
            header(FileType::Pdf, 0, 7),
            header(FileType::Pdf, 40, 7),
            footer(FileType::Pdf, 60, 5),
        ];
        let pairs = pair_matches(&matches, 1000);
        assert_eq!(
            pairs,
            vec![(matches[0], None), (matches[1], Some(matches[2]))]
        );
    }

    #[test]
    fn test_types_do_not_interfere() {
        let matches = [
            header(FileType::Jpg, 0, 4),
            header(FileType::Gif, 10, 6),
            footer(FileType::Jpg, 20, 2),
            footer(FileType::Gif, 30, 2),
        ];
        let pairs = pair_matches(&matches, 1000);
        assert_eq!(
            pairs,
            vec![(matches[0], Some(matches[2])), (matches[1], Some(matches[3]))]
        );
    }
}
