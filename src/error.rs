use thiserror::Error;

/// Errors surfaced by the rendering core.
///
/// Every error is local to the operation that produced it. Nothing here is
/// sticky: a failed call leaves the session exactly as it was before.
#[derive(Debug, Error)]
pub enum SpectrogramError {
    /// Malformed explicit input (frequency bounds, shaping parameters, sizes).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown palette: {0}")]
    UnknownPalette(String),

    /// A raster of the requested size could not be allocated.
    #[error("failed to allocate {width}x{height} raster")]
    Allocation { width: u32, height: u32 },
}

pub type Result<T> = std::result::Result<T, SpectrogramError>;
