use super::le_u16;
use crate::types::{AnalysisFileInfo, AnalysisResult};

const EXTENSION_INTRODUCER: u8 = 0x21;
const IMAGE_DESCRIPTOR: u8 = 0x2C;
const TRAILER: u8 = 0x3B;

const GRAPHIC_CONTROL_LABEL: u8 = 0xF9;
const COMMENT_LABEL: u8 = 0xFE;
const PLAIN_TEXT_LABEL: u8 = 0x01;
const APPLICATION_LABEL: u8 = 0xFF;

const SCREEN_DESCRIPTOR_END: usize = 13;

#[inline]
fn colour_table_len(flags: u8) -> usize {
    if flags & 0x80 == 0 {
        0
    } else {
        3 * (1 << ((flags & 0x07) + 1))
    }
}

/// Walks a chain of data sub-blocks and returns the offset just past the
/// block terminator, or `None` if the chain runs off the end.
fn skip_sub_blocks(data: &[u8], mut pos: usize) -> Option<usize> {
    loop {
        let size = *data.get(pos)? as usize;
        pos += 1;
        if size == 0 {
            return Some(pos);
        }
        pos += size;
        if pos > data.len() {
            return None;
        }
    }
}

pub fn validate(data: &[u8]) -> (AnalysisResult, AnalysisFileInfo) {
    if data.len() < SCREEN_DESCRIPTOR_END || !(data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a")) {
        return (AnalysisResult::Unrecognised, AnalysisFileInfo::default());
    }

    let mut result = AnalysisResult::Correct;

    let width = le_u16(data, 6).unwrap_or(0);
    let height = le_u16(data, 8).unwrap_or(0);
    if width == 0 || height == 0 {
        result = result.degrade(AnalysisResult::FormatError);
    }

    let mut pos = SCREEN_DESCRIPTOR_END + colour_table_len(data[10]);
    let mut images = 0usize;
    let mut trailer_end = None;

    while pos <= data.len() {
        let Some(&introducer) = data.get(pos) else {
            break;
        };

        match introducer {
            TRAILER => {
                trailer_end = Some(pos + 1);
                break;
            }
            EXTENSION_INTRODUCER => {
                let Some(&label) = data.get(pos + 1) else {
                    break;
                };
                if !matches!(
                    label,
                    GRAPHIC_CONTROL_LABEL | COMMENT_LABEL | PLAIN_TEXT_LABEL | APPLICATION_LABEL
                ) {
                    result = result.degrade(AnalysisResult::FormatError);
                }
                match skip_sub_blocks(data, pos + 2) {
                    Some(next) => pos = next,
                    None => {
                        result = result.degrade(AnalysisResult::Corrupted);
                        break;
                    }
                }
            }
            IMAGE_DESCRIPTOR => {
                let Some(&flags) = data.get(pos + 9) else {
                    result = result.degrade(AnalysisResult::Corrupted);
                    break;
                };
                pos += 10 + colour_table_len(flags);

                let Some(&min_code_size) = data.get(pos) else {
                    result = result.degrade(AnalysisResult::Corrupted);
                    break;
                };
                if !(2..=12).contains(&min_code_size) {
                    result = result.degrade(AnalysisResult::FormatError);
                }
                match skip_sub_blocks(data, pos + 1) {
                    Some(next) => pos = next,
                    None => {
                        result = result.degrade(AnalysisResult::Corrupted);
                        break;
                    }
                }
                images += 1;
            }
            _ => {
                result = result.degrade(AnalysisResult::FormatError);
                break;
            }
        }
    }

    if trailer_end.is_none() || images == 0 {
        result = result.degrade(AnalysisResult::Partial);
    }

    let info = AnalysisFileInfo {
        actual_size: trailer_end.map(|end| end as u64),
        ..Default::default()
    };
    (result, info)
}
