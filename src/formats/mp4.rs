//! ISO base media (MP4) and QuickTime (MOV) containers.

use super::{be_u32, be_u64};
use crate::types::{AnalysisFileInfo, AnalysisResult, FileType};

const QUICKTIME_BRAND: &[u8; 4] = b"qt  ";

const MP4_BRANDS: [&[u8; 4]; 22] = [
    b"isom", b"iso2", b"iso3", b"iso4", b"iso5", b"iso6", b"iso8", b"iso9", b"mp41", b"mp42",
    b"avc1", b"M4V ", b"M4A ", b"M4P ", b"M4B ", b"dash", b"3gp4", b"3gp5", b"3gp6", b"3g2a",
    b"mmp4", b"f4v ",
];

const TOP_LEVEL_BOXES: [&[u8; 4]; 18] = [
    b"ftyp", b"moov", b"mdat", b"free", b"skip", b"wide", b"uuid", b"meta", b"pnot", b"pdin",
    b"moof", b"mfra", b"styp", b"sidx", b"emsg", b"prft", b"udta", b"PICT",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxHeader {
    pub box_type: [u8; 4],
    pub header_len: usize,
    pub size: u64,
}

/// Reads the box header at `pos`. A 64-bit size follows when the 32-bit size
/// is 1, and a size of 0 extends the box to the end of `data`.
pub fn read_box_header(data: &[u8], pos: usize) -> Option<BoxHeader> {
    let size32 = be_u32(data, pos)?;
    let box_type: [u8; 4] = data.get(pos + 4..pos + 8)?.try_into().ok()?;
    let (size, header_len) = match size32 {
        0 => ((data.len() - pos) as u64, 8),
        1 => (be_u64(data, pos + 8)?, 16),
        n => (n as u64, 8),
    };
    Some(BoxHeader {
        box_type,
        header_len,
        size,
    })
}

pub fn validate(file_type: FileType, data: &[u8]) -> (AnalysisResult, AnalysisFileInfo) {
    let Some(ftyp) = read_box_header(data, 0).filter(|h| &h.box_type == b"ftyp") else {
        return (AnalysisResult::Unrecognised, AnalysisFileInfo::default());
    };

    let mut result = AnalysisResult::Correct;
    let mut info = AnalysisFileInfo::default();

    match data.get(8..12) {
        Some(brand) if brand == QUICKTIME_BRAND => {
            if file_type != FileType::Mov {
                info.actual_type = Some(FileType::Mov);
            }
        }
        Some(brand) if MP4_BRANDS.iter().any(|b| brand == *b) => {
            if file_type != FileType::Mp4 {
                info.actual_type = Some(FileType::Mp4);
            }
        }
        _ => result = result.degrade(AnalysisResult::FormatError),
    }
    if ftyp.size < 16 {
        result = result.degrade(AnalysisResult::FormatError);
    }

    let mut has_moov = false;
    let mut has_mdat = false;
    let mut pos = 0usize;

    while let Some(header) = read_box_header(data, pos) {
        if !TOP_LEVEL_BOXES.contains(&&header.box_type) {
            break;
        }
        if header.size < header.header_len as u64 {
            result = result.degrade(AnalysisResult::Corrupted);
            break;
        }

        match &header.box_type {
            b"moov" => has_moov = true,
            b"mdat" => has_mdat = true,
            _ => {}
        }

        let Some(end) = (pos as u64).checked_add(header.size) else {
            result = result.degrade(AnalysisResult::Corrupted);
            break;
        };
        if end > data.len() as u64 {
            result = result.degrade(AnalysisResult::Partial);
            pos = data.len();
            break;
        }
        pos = end as usize;
    }

    if !has_moov || !has_mdat {
        result = result.degrade(AnalysisResult::Partial);
    }

    info.actual_size = Some(pos as u64);
    (result, info)
}
