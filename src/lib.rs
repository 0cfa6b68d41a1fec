//! Scrolling audio spectrogram renderer.
//!
//! Frames of byte frequency magnitudes go in, one column per tick; a
//! fixed-width false-colour raster per channel comes out, and can be exported
//! with frequency/time axes and a colour legend.

pub mod audio;
pub mod config;
pub mod encode;
pub mod error;
pub mod render;
pub mod spectrum;

pub use error::{Result, SpectrogramError};
pub use render::export::{ChannelImage, ExportCompositor, ExportOptions};
pub use render::raster::Raster;
pub use render::session::{CancelHandle, Spectrogram, TickOutcome};
pub use render::spectrogram::{column_width_from_zoom, RenderSettings, SessionState, SpectrogramState};
pub use spectrum::axis::{AxisConfig, AxisMapper, AxisScale};
pub use spectrum::frame::{FramePoll, FrameQueue, FrameSource, FrequencyFrame};
pub use spectrum::palette::{Palette, PaletteRegistry};
pub use spectrum::shape::{shape, ShapeConfig};
