pub mod export;
pub mod raster;
pub mod scroll;
pub mod session;
pub mod spectrogram;
pub mod text;
