//! Carve pass: plans per-chunk work from the paired matches, then streams
//! each candidate out of the input once, in chunk order.

pub mod buffer;
pub mod executor;
pub mod output;
pub mod plan;

pub use buffer::CarveBuffer;
pub use executor::{carve_phase, carve_with_layout};
pub use output::{unique_path, OutputLayout};
pub use plan::{classify, CarveFileInfo, CarvePlan, ChunkCarveInfo, ChunkCarveType};
