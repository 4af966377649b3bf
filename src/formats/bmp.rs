use super::{le_u16, le_u32};
use crate::types::{AnalysisFileInfo, AnalysisResult};

const FILE_HEADER_LEN: u32 = 14;

const DIB_HEADER_SIZES: [u32; 7] = [12, 40, 52, 56, 64, 108, 124];
const BIT_COUNTS: [u16; 6] = [1, 4, 8, 16, 24, 32];
const COMPRESSION_METHODS: [u32; 10] = [0, 1, 2, 3, 4, 5, 6, 11, 12, 13];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DibHeader {
    width: i64,
    height: i64,
    planes: u16,
    bit_count: u16,
    compression: u32,
}

fn parse_dib(data: &[u8], dib_size: u32) -> Option<DibHeader> {
    if dib_size == 12 {
        return Some(DibHeader {
            width: le_u16(data, 18)? as i64,
            height: le_u16(data, 20)? as i64,
            planes: le_u16(data, 22)?,
            bit_count: le_u16(data, 24)?,
            compression: 0,
        });
    }
    Some(DibHeader {
        width: le_u32(data, 18)? as i32 as i64,
        height: le_u32(data, 22)? as i32 as i64,
        planes: le_u16(data, 26)?,
        bit_count: le_u16(data, 28)?,
        compression: le_u32(data, 30)?,
    })
}

pub fn validate(data: &[u8]) -> (AnalysisResult, AnalysisFileInfo) {
    if data.len() < 26 || !data.starts_with(b"BM") {
        return (AnalysisResult::Unrecognised, AnalysisFileInfo::default());
    }

    let mut result = AnalysisResult::Correct;

    let file_size = le_u32(data, 2).unwrap_or(0);
    let reserved = le_u32(data, 6).unwrap_or(0);
    let pixel_offset = le_u32(data, 10).unwrap_or(0);
    let dib_size = le_u32(data, 14).unwrap_or(0);

    if reserved != 0 {
        result = result.degrade(AnalysisResult::FormatError);
    }

    if !DIB_HEADER_SIZES.contains(&dib_size) {
        result = result.degrade(AnalysisResult::FormatError);
        return (result, AnalysisFileInfo::default());
    }

    match parse_dib(data, dib_size) {
        Some(dib) => {
            if dib.planes != 1 {
                result = result.degrade(AnalysisResult::FormatError);
            }
            if !BIT_COUNTS.contains(&dib.bit_count) {
                result = result.degrade(AnalysisResult::FormatError);
            }
            if !COMPRESSION_METHODS.contains(&dib.compression) {
                result = result.degrade(AnalysisResult::FormatError);
            }
            if dib.width <= 0 || dib.height == 0 {
                result = result.degrade(AnalysisResult::FormatError);
            }
        }
        None => result = result.degrade(AnalysisResult::Partial),
    }

    let header_end = FILE_HEADER_LEN + dib_size;
    if pixel_offset < header_end || pixel_offset >= file_size {
        result = result.degrade(AnalysisResult::FormatError);
    }

    if file_size as usize > data.len() {
        result = result.degrade(AnalysisResult::Partial);
    }

    (result, AnalysisFileInfo::with_size(file_size as u64))
}
