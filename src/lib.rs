pub mod carving;
pub mod config;
pub mod error;
pub mod formats;
pub mod io;
pub mod matcher;
pub mod pairing;
pub mod pattern;
pub mod report;
pub mod search;
pub mod types;

pub use carving::{carve_phase, carve_with_layout, OutputLayout};
pub use config::{OutputConfig, ScoopConfig};
pub use error::{Result, ScoopError};
pub use io::{ChunkSource, DiskReader};
pub use matcher::StreamingMatcher;
pub use pairing::{pair_matches, pair_matches_with_stats, PairingStats};
pub use report::{CarveReport, CarveStats, CarvedFile};
pub use search::search_phase;
pub use types::{
    AnalysisFileInfo, AnalysisResult, FileType, FileTypePart, Match, MatchPair, Offset,
    PairingStrategy, Part, DEFAULT_CARVE_SIZE, DEFAULT_CHUNK_SIZE,
};
