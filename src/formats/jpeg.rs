use super::be_u16;
use crate::types::{AnalysisFileInfo, AnalysisResult};

pub const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
pub const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

const DHT: u8 = 0xC4;
const DAC: u8 = 0xCC;
const SOS: u8 = 0xDA;
const DQT: u8 = 0xDB;
const DNL: u8 = 0xDC;
const DRI: u8 = 0xDD;
const DHP: u8 = 0xDE;
const EXP: u8 = 0xDF;
const COM: u8 = 0xFE;

/// Markers that carry a length-prefixed segment: frame headers, tables,
/// scan headers, application data and comments.
#[inline]
pub fn is_segment_marker(marker: u8) -> bool {
    is_sof(marker)
        || matches!(marker, DHT | DAC | SOS | DQT | DNL | DRI | DHP | EXP | COM)
        || (0xE0..=0xEF).contains(&marker)
}

#[inline]
fn is_sof(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

#[inline]
fn is_standalone(marker: u8) -> bool {
    matches!(marker, 0x01 | 0xD0..=0xD7)
}

fn frame_header_is_sane(payload: &[u8]) -> bool {
    // precision, height, width, component count, 3 bytes per component
    if payload.len() < 6 {
        return false;
    }
    let precision = payload[0];
    let width = u16::from_be_bytes([payload[3], payload[4]]);
    let components = payload[5] as usize;
    matches!(precision, 8 | 12 | 16)
        && width > 0
        && components > 0
        && payload.len() == 6 + components * 3
}

/// Skips entropy-coded scan data starting at `pos` and returns the offset of
/// the next real marker, or `data.len()` if the scan runs off the end.
pub fn skip_scan_data(data: &[u8], mut pos: usize) -> usize {
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        match data[pos + 1] {
            0x00 | 0xD0..=0xD7 => pos += 2,
            0xFF => pos += 1,
            _ => return pos,
        }
    }
    data.len()
}

pub fn validate(data: &[u8]) -> (AnalysisResult, AnalysisFileInfo) {
    if data.len() < 4 || data[..2] != JPEG_SOI || data[2] != 0xFF {
        return (AnalysisResult::Unrecognised, AnalysisFileInfo::default());
    }

    let mut result = AnalysisResult::Correct;
    let mut pos = 2;
    let mut has_sof = false;
    let mut has_sos = false;
    let mut eoi_end = None;

    while pos < data.len() {
        if data[pos] != 0xFF {
            result = result.degrade(AnalysisResult::FormatError);
            break;
        }
        let Some(&marker) = data.get(pos + 1) else {
            break;
        };

        match marker {
            0xFF => {
                pos += 1;
                continue;
            }
            0xD9 => {
                eoi_end = Some(pos + 2);
                break;
            }
            0xD8 => {
                result = result.degrade(AnalysisResult::FormatError);
                pos += 2;
                continue;
            }
            m if is_standalone(m) => {
                pos += 2;
                continue;
            }
            m if !is_segment_marker(m) => {
                result = result.degrade(AnalysisResult::FormatError);
                break;
            }
            _ => {}
        }

        let Some(seg_len) = be_u16(data, pos + 2) else {
            result = result.degrade(AnalysisResult::Corrupted);
            break;
        };
        let seg_len = seg_len as usize;
        if seg_len < 2 || pos + 2 + seg_len > data.len() {
            result = result.degrade(AnalysisResult::Corrupted);
            break;
        }

        let payload = &data[pos + 4..pos + 2 + seg_len];
        if is_sof(marker) {
            has_sof = true;
            if !frame_header_is_sane(payload) {
                result = result.degrade(AnalysisResult::FormatError);
            }
        }

        pos += 2 + seg_len;

        if marker == SOS {
            has_sos = true;
            pos = skip_scan_data(data, pos);
        }
    }

    if eoi_end.is_none() || !has_sof || !has_sos {
        result = result.degrade(AnalysisResult::Partial);
    }

    let info = AnalysisFileInfo {
        actual_size: eoi_end.map(|end| end as u64),
        ..Default::default()
    };
    (result, info)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![0xFF, marker];
        out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn minimal_jpeg(scan: &[u8]) -> Vec<u8> {
        let mut out = JPEG_SOI.to_vec();
        out.extend(segment(0xE0, b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0"));
        out.extend(segment(0xDB, &[0u8; 65]));
        out.extend(segment(0xC0, &[8, 0, 16, 0, 16, 1, 1, 0x11, 0]));
        out.extend(segment(0xC4, &[0u8; 20]));
        out.extend(segment(0xDA, &[1, 1, 0, 0, 63, 0]));
        out.extend_from_slice(scan);
        out.extend_from_slice(&JPEG_EOI);
        out
    }

    #[test]
    fn test_minimal_jpeg_is_correct() {
        let data = minimal_jpeg(&[0x12, 0x34, 0xFF, 0x00, 0x56]);
        let (result, info) = validate(&data);
        assert_eq!(result, AnalysisResult::Correct);
        assert_eq!(info.actual_size, Some(data.len() as u64));
    }

    #[test]
    fn test_restart_markers_in_scan() {
        let data = minimal_jpeg(&[0x01, 0xFF, 0xD0, 0x02, 0xFF, 0xD7, 0x03]);
        assert_eq!(validate(&data).0, AnalysisResult::Correct);
    }

    #[test]
    fn test_missing_eoi_is_partial() {
        let mut data = minimal_jpeg(&[0x12]);
        data.truncate(data.len() - 2);
        assert_eq!(validate(&data).0, AnalysisResult::Partial);
    }

    #[test]
    fn test_missing_sof_is_partial() {
        let mut data = JPEG_SOI.to_vec();
        data.extend(segment(0xE0, b"JFIF\0"));
        data.extend_from_slice(&JPEG_EOI);
        assert_eq!(validate(&data).0, AnalysisResult::Partial);
    }

    #[test]
    fn test_unknown_marker_is_format_error() {
        let mut data = JPEG_SOI.to_vec();
        data.extend(segment(0xE0, b"JFIF\0"));
        data.extend(segment(0x4F, &[1, 2]));
        data.extend_from_slice(&JPEG_EOI);
        assert_eq!(validate(&data).0, AnalysisResult::FormatError);
    }

    #[test]
    fn test_segment_markers() {
        for m in [0xC0, 0xC2, 0xC4, 0xDA, 0xDB, 0xDD, 0xE0, 0xE1, 0xEF, 0xFE] {
            assert!(is_segment_marker(m), "{m:#04x}");
        }
        for m in [0x00, 0x4F, 0xC8, 0xD0, 0xD8, 0xD9, 0xF0, 0xFF] {
            assert!(!is_segment_marker(m), "{m:#04x}");
        }
    }

    #[test]
    fn test_reserved_jpg_marker_is_format_error() {
        let mut data = JPEG_SOI.to_vec();
        data.extend(segment(0xC8, &[1, 2]));
        data.extend_from_slice(&JPEG_EOI);
        assert_eq!(validate(&data).0, AnalysisResult::FormatError);
    }

    #[test]
    fn test_segment_overrun_is_corrupted() {
        let mut data = JPEG_SOI.to_vec();
        data.extend_from_slice(&[0xFF, 0xE0, 0x10, 0x00, 1, 2, 3]);
        assert_eq!(validate(&data).0, AnalysisResult::Corrupted);
    }

    #[test]
    fn test_not_jpeg() {
        assert_eq!(validate(b"GIF89a").0, AnalysisResult::Unrecognised);
    }
}
