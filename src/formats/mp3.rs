use super::be_u32;
use crate::types::{AnalysisFileInfo, AnalysisResult};

const ID3_HEADER_LEN: usize = 10;
const ID3V1_TAG_LEN: usize = 128;

const MPEG1_LAYER3_KBPS: [u32; 15] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
const MPEG2_LAYER3_KBPS: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];
const MPEG1_SAMPLE_RATES: [u32; 3] = [44100, 48000, 32000];

/// Decodes a 28-bit syncsafe integer. Returns `None` if any byte has its top
/// bit set.
pub fn syncsafe(bytes: [u8; 4]) -> Option<u32> {
    if bytes.iter().any(|b| b & 0x80 != 0) {
        return None;
    }
    Some(bytes.iter().fold(0u32, |acc, &b| (acc << 7) | b as u32))
}

#[inline]
pub fn is_frame_sync(data: &[u8], pos: usize) -> bool {
    matches!(data.get(pos..pos + 2), Some(&[0xFF, b]) if b & 0xE0 == 0xE0)
}

/// Length in bytes of the MPEG-1/2/2.5 Layer III frame described by `header`.
pub fn frame_length(header: u32) -> Option<usize> {
    let version = (header >> 19) & 0x3;
    let layer = (header >> 17) & 0x3;
    let bitrate_index = ((header >> 12) & 0xF) as usize;
    let rate_index = ((header >> 10) & 0x3) as usize;
    let padding = (header >> 9) & 0x1;

    if version == 1 || layer != 1 || bitrate_index == 0 || bitrate_index == 15 || rate_index == 3 {
        return None;
    }

    let (kbps, rate, coefficient) = match version {
        3 => (MPEG1_LAYER3_KBPS[bitrate_index], MPEG1_SAMPLE_RATES[rate_index], 144),
        2 => (MPEG2_LAYER3_KBPS[bitrate_index], MPEG1_SAMPLE_RATES[rate_index] / 2, 72),
        _ => (MPEG2_LAYER3_KBPS[bitrate_index], MPEG1_SAMPLE_RATES[rate_index] / 4, 72),
    };

    Some((coefficient * kbps * 1000 / rate + padding) as usize)
}

pub fn validate(data: &[u8]) -> (AnalysisResult, AnalysisFileInfo) {
    if data.len() < ID3_HEADER_LEN || !data.starts_with(b"ID3") {
        return (AnalysisResult::Unrecognised, AnalysisFileInfo::default());
    }

    let mut result = AnalysisResult::Correct;

    let major = data[3];
    if !(2..=4).contains(&major) || data[4] == 0xFF {
        result = result.degrade(AnalysisResult::FormatError);
    }

    let flags = data[5];
    let Some(tag_size) = syncsafe([data[6], data[7], data[8], data[9]]) else {
        result = result.degrade(AnalysisResult::Corrupted);
        return (result, AnalysisFileInfo::default());
    };

    let mut pos = ID3_HEADER_LEN + tag_size as usize;
    if major == 4 && flags & 0x10 != 0 {
        pos += ID3_HEADER_LEN;
    }
    if pos >= data.len() {
        result = result.degrade(AnalysisResult::Partial);
        return (result, AnalysisFileInfo::default());
    }

    // some encoders pad the tag with zeros beyond its declared size
    while data.get(pos) == Some(&0) {
        pos += 1;
    }

    let mut frames = 0usize;
    while is_frame_sync(data, pos) {
        let Some(length) = be_u32(data, pos).and_then(frame_length) else {
            break;
        };
        if pos + length > data.len() {
            result = result.degrade(AnalysisResult::Partial);
            break;
        }
        pos += length;
        frames += 1;
    }

    if frames == 0 {
        let missing = if pos >= data.len() {
            AnalysisResult::Partial
        } else {
            AnalysisResult::FormatError
        };
        result = result.degrade(missing);
        return (result, AnalysisFileInfo::default());
    }

    if data.get(pos..pos + 3) == Some(b"TAG") && pos + ID3V1_TAG_LEN <= data.len() {
        pos += ID3V1_TAG_LEN;
    }

    (result, AnalysisFileInfo::with_size(pos as u64))
}
