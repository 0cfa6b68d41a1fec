use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;

use crate::render::raster::Raster;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Bmp,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Bmp => "bmp",
        }
    }

    fn image_format(&self) -> image::ImageFormat {
        match self {
            ExportFormat::Png => image::ImageFormat::Png,
            ExportFormat::Bmp => image::ImageFormat::Bmp,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "bmp" => Ok(ExportFormat::Bmp),
            other => anyhow::bail!("Unsupported export format: {} (expected png or bmp)", other),
        }
    }
}

/// Encode a raster into an in-memory image file.
pub fn encode(raster: &Raster, format: ExportFormat) -> Result<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    image::write_buffer_with_format(
        &mut bytes,
        raster.pixels(),
        raster.width(),
        raster.height(),
        image::ColorType::Rgba8,
        format.image_format(),
    )
    .with_context(|| format!("Failed to encode {} image", format.extension()))?;
    Ok(bytes.into_inner())
}

pub fn save(raster: &Raster, path: &Path, format: ExportFormat) -> Result<()> {
    let bytes = encode(raster, format)?;
    std::fs::write(path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!(
        "Saved {}x{} {} to {}",
        raster.width(),
        raster.height(),
        format.extension(),
        path.display()
    );
    Ok(())
}
