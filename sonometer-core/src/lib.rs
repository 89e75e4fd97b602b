//! # sonometer-core
//!
//! Platform-agnostic sound level meter core library.
//!
//! Provides the circular statistics series, streak accumulation, chunk
//! intensity, the callback-driven acquisition engine and the control surface.
//! Platform-specific backends implement the `AudioDriver` trait and plug into
//! the generic `Sonometer`.
//!
//! ## Architecture
//!
//! ```text
//! sonometer-core (this crate)
//! ├── traits/       ← AudioDriver, DriverStream, PlotSurface
//! ├── models/       ← SonometerError, EngineState, StreamConfig, SonometerConfig, Device, etc.
//! ├── processing/   ← CircularStatSeries, Streak, chunk intensity, ChunkAssembler
//! ├── session/      ← AudioEngine, MeterState (router), DisplayLoop, Sonometer
//! ├── render/       ← frame drawing, SVG surface
//! └── storage/      ← streak CSV files, capture naming
//! ```

pub mod models;
pub mod processing;
pub mod render;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{Device, HostApi, RouterDiagnostics};
pub use models::command_status::CommandStatus;
pub use models::config::{SampleFormat, SonometerConfig, StreamConfig};
pub use models::error::SonometerError;
pub use models::state::{EngineState, StreamDecision};
pub use processing::chunk_assembler::ChunkAssembler;
pub use processing::circular_series::CircularStatSeries;
pub use processing::streak::{Streak, StreakSpan, StreakSummary};
pub use render::svg::SvgSurface;
pub use session::engine::AudioEngine;
pub use session::router::MeterState;
pub use session::sonometer::Sonometer;
pub use traits::audio_driver::{AudioDriver, ChunkCallback, ChunkSample, DriverStream, RawChunk};
pub use traits::plot_surface::{PlotColor, PlotSurface};
