pub mod chunk_assembler;
pub mod circular_series;
pub mod intensity;
pub mod stats;
pub mod streak;
