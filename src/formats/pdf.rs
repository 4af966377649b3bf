use super::{find, rfind};
use crate::types::{AnalysisFileInfo, AnalysisResult};

const EOF_MARKER: &[u8] = b"%%EOF";
const STARTXREF: &[u8] = b"startxref";

fn parse_offset(data: &[u8]) -> Option<usize> {
    let start = data.iter().position(|b| !b.is_ascii_whitespace())?;
    let digits = data[start..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 || digits > 19 {
        return None;
    }
    std::str::from_utf8(&data[start..start + digits])
        .ok()?
        .parse()
        .ok()
}

/// True if `data` opens an indirect object header such as `12 0 obj`.
fn is_object_header(data: &[u8]) -> bool {
    let window = &data[..data.len().min(32)];
    window.first().is_some_and(u8::is_ascii_digit) && find(window, b" obj").is_some()
}

pub fn validate(data: &[u8]) -> (AnalysisResult, AnalysisFileInfo) {
    if data.len() < 8 || !data.starts_with(b"%PDF-") {
        return (AnalysisResult::Unrecognised, AnalysisFileInfo::default());
    }

    let mut result = AnalysisResult::Correct;

    if !matches!(data[5], b'1' | b'2') || data[6] != b'.' || !data[7].is_ascii_digit() {
        result = result.degrade(AnalysisResult::FormatError);
    }

    let Some(eof) = rfind(data, EOF_MARKER) else {
        return (result.degrade(AnalysisResult::Partial), AnalysisFileInfo::default());
    };
    let mut end = eof + EOF_MARKER.len();
    if data.get(end) == Some(&b'\r') {
        end += 1;
    }
    if data.get(end) == Some(&b'\n') {
        end += 1;
    }

    let xref_offset = rfind(&data[..eof], STARTXREF)
        .and_then(|pos| parse_offset(&data[pos + STARTXREF.len()..eof]));

    match xref_offset {
        None => result = result.degrade(AnalysisResult::FormatError),
        Some(offset) if offset >= eof => result = result.degrade(AnalysisResult::Corrupted),
        Some(offset) => {
            let target = &data[offset..];
            if !target.starts_with(b"xref") && !is_object_header(target) {
                result = result.degrade(AnalysisResult::FormatError);
            }
        }
    }

    (result, AnalysisFileInfo::with_size(end as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(xref_delta: isize) -> Vec<u8> {
        let mut out = b"%PDF-1.4\n".to_vec();
        out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog >>\nendobj\n");
        let xref = out.len();
        out.extend_from_slice(b"xref\n0 2\n0000000000 65535 f \n0000000009 00000 n \n");
        out.extend_from_slice(b"trailer\n<< /Size 2 /Root 1 0 R >>\n");
        out.extend_from_slice(format!("startxref\n{}\n", xref as isize + xref_delta).as_bytes());
        out.extend_from_slice(b"%%EOF\n");
        out
    }

    #[test]
    fn test_classic_xref_is_correct() {
        let data = pdf(0);
        let (result, info) = validate(&data);
        assert_eq!(result, AnalysisResult::Correct);
        assert_eq!(info.actual_size, Some(data.len() as u64));
    }

    #[test]
    fn test_eof_without_newline() {
        let mut data = pdf(0);
        data.pop();
        assert_eq!(validate(&data).1.actual_size, Some(data.len() as u64));
    }

    #[test]
    fn test_xref_stream_object_accepted() {
        let mut data = b"%PDF-1.7\n".to_vec();
        let xref = data.len();
        data.extend_from_slice(b"5 0 obj\n<< /Type /XRef >>\nstream\nendstream\nendobj\n");
        data.extend_from_slice(format!("startxref\n{xref}\n%%EOF").as_bytes());
        assert_eq!(validate(&data).0, AnalysisResult::Correct);
    }

    #[test]
    fn test_misaligned_startxref() {
        assert_eq!(validate(&pdf(3)).0, AnalysisResult::FormatError);
    }

    #[test]
    fn test_startxref_past_end_is_corrupted() {
        assert_eq!(validate(&pdf(10_000)).0, AnalysisResult::Corrupted);
    }

    #[test]
    fn test_missing_eof_is_partial() {
        let data = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n";
        assert_eq!(validate(data).0, AnalysisResult::Partial);
    }
}
