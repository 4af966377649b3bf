use super::{le_u16, le_u32};
use crate::types::{AnalysisFileInfo, AnalysisResult};

const RIFF_HEADER_LEN: usize = 12;
const FMT_MIN_LEN: usize = 16;

const FORMAT_PCM: u16 = 1;
const FORMAT_TAGS: [u16; 8] = [FORMAT_PCM, 0x0002, 0x0003, 0x0006, 0x0007, 0x0011, 0x0055, 0xFFFE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WaveFormat {
    format_tag: u16,
    channels: u16,
    sample_rate: u32,
    byte_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
}

impl WaveFormat {
    fn parse(body: &[u8]) -> Option<Self> {
        Some(Self {
            format_tag: le_u16(body, 0)?,
            channels: le_u16(body, 2)?,
            sample_rate: le_u32(body, 4)?,
            byte_rate: le_u32(body, 8)?,
            block_align: le_u16(body, 12)?,
            bits_per_sample: le_u16(body, 14)?,
        })
    }

    fn is_consistent(&self) -> bool {
        if self.channels == 0 || self.sample_rate == 0 || !FORMAT_TAGS.contains(&self.format_tag) {
            return false;
        }
        if self.format_tag != FORMAT_PCM {
            return true;
        }
        let expected_align = self.channels as u64 * (self.bits_per_sample as u64).div_ceil(8);
        self.block_align as u64 == expected_align
            && self.byte_rate as u64 == self.sample_rate as u64 * expected_align
    }
}

pub fn validate(data: &[u8]) -> (AnalysisResult, AnalysisFileInfo) {
    if data.len() < RIFF_HEADER_LEN || !data.starts_with(b"RIFF") || &data[8..12] != b"WAVE" {
        return (AnalysisResult::Unrecognised, AnalysisFileInfo::default());
    }

    let mut result = AnalysisResult::Correct;
    let total = le_u32(data, 4).unwrap_or(0) as usize + 8;
    let limit = total.min(data.len());

    let mut format: Option<WaveFormat> = None;
    let mut data_seen = false;
    let mut pos = RIFF_HEADER_LEN;

    while pos + 8 <= limit {
        let id = &data[pos..pos + 4];
        let size = le_u32(data, pos + 4).unwrap_or(0) as usize;
        if !id.iter().all(|&b| b.is_ascii_graphic() || b == b' ') {
            result = result.degrade(AnalysisResult::Corrupted);
            break;
        }

        let body_start = pos + 8;
        let body_end = body_start + size;
        let body = &data[body_start..body_end.min(data.len())];

        match id {
            b"fmt " => {
                match WaveFormat::parse(body) {
                    Some(f) if size >= FMT_MIN_LEN => {
                        if !f.is_consistent() {
                            result = result.degrade(AnalysisResult::FormatError);
                        }
                        format = Some(f);
                    }
                    Some(_) => result = result.degrade(AnalysisResult::FormatError),
                    None => result = result.degrade(AnalysisResult::Partial),
                }
            }
            b"data" => {
                if format.is_none() {
                    result = result.degrade(AnalysisResult::FormatError);
                }
                data_seen = true;
            }
            _ => {}
        }

        if body_end > data.len() {
            result = result.degrade(AnalysisResult::Partial);
            break;
        }
        pos = body_end + (size & 1);
    }

    if format.is_none() {
        result = result.degrade(AnalysisResult::FormatError);
    }
    if !data_seen || total > data.len() {
        result = result.degrade(AnalysisResult::Partial);
    }

    (result, AnalysisFileInfo::with_size(total as u64))
}
