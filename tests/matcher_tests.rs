use proptest::prelude::*;

use honeyscoop::pattern::compile_uncached;
use honeyscoop::{FileType, FileTypePart, Match, StreamingMatcher};

const PATTERN: &str = "ab(c|d)*e";

fn kind() -> FileTypePart {
    FileTypePart::header(FileType::Gif)
}

fn run_split(data: &[u8], cuts: &[usize]) -> Vec<Match> {
    let mut matcher = StreamingMatcher::new(PATTERN, kind()).unwrap();
    let mut matches = Vec::new();
    let mut from = 0;
    for &cut in cuts.iter().chain(std::iter::once(&data.len())) {
        let cut = cut.clamp(from, data.len());
        matches.extend(matcher.advance(&data[from..cut], from as u64));
        from = cut;
    }
    matches.sort_by_key(|m| (m.start, m.end));
    matches
}

#[test]
fn test_jpeg_header_in_noise() {
    let mut data = vec![0x11u8; 64];
    data[20..24].copy_from_slice(&[0xFF, 0xD8, 0xFF, 0xE0]);
    data[40..44].copy_from_slice(&[0xFF, 0xD8, 0xFF, 0xC0]);

    let mut matcher = StreamingMatcher::new(
        r"\xFF\xD8\xFF(\xDB|\xE0|\xE1|\xE2|\xEE)",
        FileTypePart::header(FileType::Jpg),
    )
    .unwrap();
    let matches = matcher.advance(&data, 1000);

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].start, 1020);
    assert_eq!(matches[0].end, 1023);
}

#[test]
fn test_match_spanning_many_chunks() {
    let data = b"xxabcdcdcdexx";
    let cuts: Vec<usize> = (1..data.len()).collect();
    let matches = run_split(data, &cuts);
    assert_eq!(matches.len(), 1);
    assert_eq!((matches[0].start, matches[0].end), (2, 10));
}

#[test]
fn test_nested_quantifier_signature_no_false_hit() {
    let kind = FileTypePart::header(FileType::Pdf);
    let mut matcher = StreamingMatcher::new("x(a+a)*y", kind).unwrap();
    assert!(matcher.advance(b"xay", 0).is_empty());

    matcher.reset();
    let found = matcher.advance(b"..xaay", 0);
    assert_eq!(found.len(), 1);
    assert_eq!((found[0].start, found[0].end), (2, 5));
}

#[test]
fn test_reset_drops_partial_matches() {
    let mut matcher = StreamingMatcher::new(PATTERN, kind()).unwrap();
    assert!(matcher.advance(b"abcc", 0).is_empty());
    assert!(matcher.in_flight() > 0);

    matcher.reset();
    assert_eq!(matcher.in_flight(), 0);
    assert!(matcher.advance(b"e", 0).is_empty());
}

proptest! {
    #[test]
    fn prop_chunking_does_not_change_matches(
        data in prop::collection::vec(prop::sample::select(b"abcdex".to_vec()), 0..200),
        mut cuts in prop::collection::vec(0usize..200, 0..8),
    ) {
        cuts.sort_unstable();
        let whole = run_split(&data, &[]);
        let split = run_split(&data, &cuts);
        prop_assert_eq!(whole, split);
    }

    #[test]
    fn prop_matches_are_in_bounds_and_accepted(
        data in prop::collection::vec(prop::sample::select(b"abcdex".to_vec()), 0..200),
    ) {
        let nfa = compile_uncached(PATTERN).unwrap();
        let matches = run_split(&data, &[]);

        let mut starts: Vec<u64> = matches.iter().map(|m| m.start).collect();
        starts.dedup();
        prop_assert_eq!(starts.len(), matches.len());

        for m in matches {
            prop_assert!(m.start <= m.end);
            prop_assert!((m.end as usize) < data.len());
            prop_assert!(nfa.accepts(&data[m.start as usize..=m.end as usize]));
        }
    }
}
