//! RAR 4.x and 5.x archives.

use super::{crc32, le_u16, le_u32};
use crate::types::{AnalysisFileInfo, AnalysisResult};

pub const RAR4_SIGNATURE: [u8; 7] = *b"Rar!\x1A\x07\x00";
pub const RAR5_SIGNATURE: [u8; 8] = *b"Rar!\x1A\x07\x01\x00";

const RAR4_BLOCK_MIN: usize = 7;
const RAR4_MAIN: u8 = 0x73;
const RAR4_FILE: u8 = 0x74;
const RAR4_END: u8 = 0x7B;
const RAR4_LONG_BLOCK: u16 = 0x8000;

const RAR5_END: u64 = 5;
const RAR5_HAS_EXTRA: u64 = 0x0001;
const RAR5_HAS_DATA: u64 = 0x0002;

/// Reads a RAR5 variable-length integer at `pos`. Returns the value and the
/// number of bytes it occupied.
pub fn read_vint(data: &[u8], pos: usize) -> Option<(u64, usize)> {
    let mut value = 0u64;
    for i in 0..10 {
        let byte = *data.get(pos + i)?;
        value |= ((byte & 0x7F) as u64) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Walk {
    Continue(usize),
    End(usize),
    Stop(AnalysisResult),
}

type BlockWalker = fn(&[u8], usize, &mut AnalysisResult) -> Walk;

fn rar4_block(data: &[u8], pos: usize, result: &mut AnalysisResult) -> Walk {
    let (Some(stored_crc), Some(&head_type), Some(flags), Some(head_size)) = (
        le_u16(data, pos),
        data.get(pos + 2),
        le_u16(data, pos + 3),
        le_u16(data, pos + 5),
    ) else {
        return Walk::Stop(AnalysisResult::Partial);
    };
    let head_size = head_size as usize;

    if !(RAR4_MAIN..=RAR4_END).contains(&head_type) || head_size < RAR4_BLOCK_MIN {
        return Walk::Stop(AnalysisResult::Partial);
    }
    let Some(header) = data.get(pos + 2..pos + head_size) else {
        return Walk::Stop(AnalysisResult::Partial);
    };
    if crc32(header) as u16 != stored_crc {
        *result = result.degrade(AnalysisResult::Corrupted);
    }

    let add_size = if head_type == RAR4_FILE || flags & RAR4_LONG_BLOCK != 0 {
        match le_u32(data, pos + 7) {
            Some(n) => n as usize,
            None => return Walk::Stop(AnalysisResult::Partial),
        }
    } else {
        0
    };

    let next = pos + head_size + add_size;
    if next > data.len() {
        return Walk::Stop(AnalysisResult::Partial);
    }
    if head_type == RAR4_END {
        Walk::End(next)
    } else {
        Walk::Continue(next)
    }
}

fn rar5_block(data: &[u8], pos: usize, result: &mut AnalysisResult) -> Walk {
    let Some(stored_crc) = le_u32(data, pos) else {
        return Walk::Stop(AnalysisResult::Partial);
    };
    let Some((header_size, size_len)) = read_vint(data, pos + 4) else {
        return Walk::Stop(AnalysisResult::Partial);
    };
    if header_size == 0 || header_size > 2 * 1024 * 1024 {
        return Walk::Stop(AnalysisResult::Partial);
    }

    let body = pos + 4 + size_len;
    let header_end = body + header_size as usize;
    let Some(covered) = data.get(pos + 4..header_end) else {
        return Walk::Stop(AnalysisResult::Partial);
    };
    if crc32(covered) != stored_crc {
        *result = result.degrade(AnalysisResult::Corrupted);
    }

    let Some((header_type, type_len)) = read_vint(data, body) else {
        return Walk::Stop(AnalysisResult::Partial);
    };
    let Some((flags, flags_len)) = read_vint(data, body + type_len) else {
        return Walk::Stop(AnalysisResult::Partial);
    };
    if !(1..=RAR5_END).contains(&header_type) {
        return Walk::Stop(AnalysisResult::Partial);
    }

    let mut cursor = body + type_len + flags_len;
    if flags & RAR5_HAS_EXTRA != 0 {
        match read_vint(data, cursor) {
            Some((_, n)) => cursor += n,
            None => return Walk::Stop(AnalysisResult::Partial),
        }
    }
    let data_size = if flags & RAR5_HAS_DATA != 0 {
        match read_vint(data, cursor) {
            Some((n, _)) => n,
            None => return Walk::Stop(AnalysisResult::Partial),
        }
    } else {
        0
    };

    let next = match (header_end as u64).checked_add(data_size) {
        Some(next) if next <= data.len() as u64 => next,
        Some(_) => return Walk::Stop(AnalysisResult::Partial),
        None => return Walk::Stop(AnalysisResult::Corrupted),
    };
    if header_type == RAR5_END {
        Walk::End(next as usize)
    } else {
        Walk::Continue(next as usize)
    }
}

pub fn validate(data: &[u8]) -> (AnalysisResult, AnalysisFileInfo) {
    let (start, block) = if data.starts_with(&RAR5_SIGNATURE) {
        (RAR5_SIGNATURE.len(), rar5_block as BlockWalker)
    } else if data.starts_with(&RAR4_SIGNATURE) {
        (RAR4_SIGNATURE.len(), rar4_block as BlockWalker)
    } else {
        return (AnalysisResult::Unrecognised, AnalysisFileInfo::default());
    };

    let mut result = AnalysisResult::Correct;
    let mut pos = start;
    let mut blocks = 0usize;
    let mut end = None;

    while pos < data.len() {
        match block(data, pos, &mut result) {
            Walk::Continue(next) => {
                pos = next;
                blocks += 1;
            }
            Walk::End(next) => {
                end = Some(next);
                break;
            }
            Walk::Stop(outcome) => {
                result = result.degrade(outcome);
                break;
            }
        }
    }

    if blocks == 0 || end.is_none() {
        result = result.degrade(AnalysisResult::Partial);
    }

    let info = AnalysisFileInfo {
        actual_size: end.map(|e| e as u64),
        ..Default::default()
    };
    (result, info)
}
