//! Per-format signatures and structural validators.
//!
//! Every validator takes the carved bytes, whose first byte is the first byte
//! of the header match, and folds its sub-checks into one
//! [`AnalysisResult`] with [`AnalysisResult::degrade`].

pub mod bmp;
pub mod gif;
pub mod jpeg;
pub mod mp3;
pub mod mp4;
pub mod pdf;
pub mod png;
pub mod rar;
pub mod wav;
pub mod zip;

use crate::types::{AnalysisFileInfo, AnalysisResult, FileType, PairingStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub header: &'static str,
    pub footer: Option<&'static str>,
    pub strategy: PairingStrategy,
    pub requires_footer: bool,
}

impl Signature {
    #[inline]
    pub fn has_footer(&self) -> bool {
        self.footer.is_some()
    }
}

const fn with_footer(
    header: &'static str,
    footer: &'static str,
    strategy: PairingStrategy,
    requires_footer: bool,
) -> Signature {
    Signature {
        header,
        footer: Some(footer),
        strategy,
        requires_footer,
    }
}

const fn header_only(header: &'static str) -> Signature {
    Signature {
        header,
        footer: None,
        strategy: PairingStrategy::PairNext,
        requires_footer: false,
    }
}

const ZIP_FOOTER: &str = r"PK\x05\x06..................";
const OOXML_HEADER: &str = r"PK\x03\x04\x14\x00\x06\x00";

pub fn signature(file_type: FileType) -> Signature {
    use PairingStrategy::*;

    match file_type {
        FileType::Png => with_footer(r"\x89PNG\x0D\x0A\x1A\x0A", r"IEND\xAE\x42\x60\x82", PairNext, true),
        FileType::Jpg => with_footer(r"\xFF\xD8\xFF(\xDB|\xE0|\xE1|\xE2|\xEE)", r"\xFF\xD9", PairNext, true),
        FileType::Gif => with_footer("GIF8(7|9)a", r"\x00\x3B", PairNext, true),
        FileType::Bmp => header_only(r"BM....\x00\x00\x00\x00"),
        FileType::Mp3 => header_only(r"ID3(\x02|\x03|\x04)\x00"),
        FileType::Wav => header_only("RIFF....WAVE"),
        FileType::Mp4 => header_only(r"\x00\x00\x00(\x14|\x18|\x1C|\x20)ftyp"),
        FileType::Mov => header_only(r"\x00\x00\x00(\x14|\x18|\x1C|\x20)ftypqt  "),
        FileType::Zip => with_footer(r"PK\x03\x04", ZIP_FOOTER, PairLast, true),
        FileType::Docx | FileType::Xlsx | FileType::Pptx => {
            with_footer(OOXML_HEADER, ZIP_FOOTER, PairLast, true)
        }
        FileType::Rar => with_footer(
            r"Rar!\x1A\x07(\x00|\x01\x00)",
            r"(\xC4\x3D\x7B\x00\x40\x07\x00)|(\x1D\x77\x56\x51\x03\x05\x04\x00)",
            PairNext,
            false,
        ),
        FileType::Pdf => with_footer(r"%PDF-(1|2)\x2E", "%%EOF", PairLast, false),
    }
}

pub fn validate(file_type: FileType, data: &[u8]) -> (AnalysisResult, AnalysisFileInfo) {
    match file_type {
        FileType::Png => png::validate(data),
        FileType::Jpg => jpeg::validate(data),
        FileType::Gif => gif::validate(data),
        FileType::Bmp => bmp::validate(data),
        FileType::Mp3 => mp3::validate(data),
        FileType::Wav => wav::validate(data),
        FileType::Mp4 | FileType::Mov => mp4::validate(file_type, data),
        FileType::Zip | FileType::Docx | FileType::Xlsx | FileType::Pptx => {
            zip::validate(file_type, data)
        }
        FileType::Rar => rar::validate(data),
        FileType::Pdf => pdf::validate(data),
    }
}

/// Standard reflected CRC-32 (polynomial 0xEDB88320), as used by PNG, ZIP
/// and RAR.
#[inline]
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

#[inline]
pub(crate) fn be_u16(data: &[u8], pos: usize) -> Option<u16> {
    let b = data.get(pos..pos.checked_add(2)?)?;
    Some(u16::from_be_bytes([b[0], b[1]]))
}

#[inline]
pub(crate) fn be_u32(data: &[u8], pos: usize) -> Option<u32> {
    let b = data.get(pos..pos.checked_add(4)?)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

#[inline]
pub(crate) fn be_u64(data: &[u8], pos: usize) -> Option<u64> {
    let b = data.get(pos..pos.checked_add(8)?)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(b);
    Some(u64::from_be_bytes(buf))
}

#[inline]
pub(crate) fn le_u16(data: &[u8], pos: usize) -> Option<u16> {
    let b = data.get(pos..pos.checked_add(2)?)?;
    Some(u16::from_le_bytes([b[0], b[1]]))
}

#[inline]
pub(crate) fn le_u32(data: &[u8], pos: usize) -> Option<u32> {
    let b = data.get(pos..pos.checked_add(4)?)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Last occurrence of `needle` in `haystack`.
pub(crate) fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .rev()
        .find(|&i| &haystack[i..i + needle.len()] == needle)
}

pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern;

    #[test]
    fn test_crc32_reference_values() {
        assert_eq!(crc32(b""), 0);
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_every_signature_compiles() {
        for t in FileType::ALL {
            let sig = signature(t);
            assert!(pattern::compile(sig.header).is_ok(), "{t} header");
            if let Some(footer) = sig.footer {
                assert!(pattern::compile(footer).is_ok(), "{t} footer");
            }
        }
    }

    #[test]
    fn test_required_footers_are_defined() {
        for t in FileType::ALL {
            let sig = signature(t);
            if sig.requires_footer {
                assert!(sig.has_footer(), "{t}");
            }
        }
    }

    #[test]
    fn test_signature_accepts_magic() {
        let nfa = pattern::compile(signature(FileType::Png).header).unwrap();
        assert!(nfa.accepts(&png::PNG_SIGNATURE));

        let nfa = pattern::compile(signature(FileType::Rar).footer.unwrap()).unwrap();
        assert!(nfa.accepts(&[0xC4, 0x3D, 0x7B, 0x00, 0x40, 0x07, 0x00]));
        assert!(nfa.accepts(&[0x1D, 0x77, 0x56, 0x51, 0x03, 0x05, 0x04, 0x00]));
    }

    #[test]
    fn test_byte_readers_bounds() {
        let data = [0x12, 0x34, 0x56, 0x78];
        assert_eq!(be_u16(&data, 0), Some(0x1234));
        assert_eq!(le_u16(&data, 2), Some(0x7856));
        assert_eq!(be_u32(&data, 0), Some(0x1234_5678));
        assert_eq!(le_u32(&data, 1), None);
        assert_eq!(be_u16(&data, usize::MAX), None);
    }

    #[test]
    fn test_find_and_rfind() {
        let data = b"abcXYabcXY";
        assert_eq!(find(data, b"XY"), Some(3));
        assert_eq!(rfind(data, b"XY"), Some(8));
        assert_eq!(rfind(data, b"zz"), None);
    }
}
