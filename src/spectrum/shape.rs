use crate::error::{Result, SpectrogramError};

/// Gain and exponent applied to raw magnitudes before colouring.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeConfig {
    pub sensitivity: f32,
    pub contrast: f32,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            sensitivity: 1.0,
            contrast: 1.0,
        }
    }
}

impl ShapeConfig {
    /// Build from slider percentages (100% == 1.0).
    pub fn from_percent(sensitivity: f32, contrast: f32) -> Self {
        Self {
            sensitivity: sensitivity / 100.0,
            contrast: contrast / 100.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.sensitivity.is_finite() && self.sensitivity > 0.0) {
            return Err(SpectrogramError::InvalidConfig(format!(
                "sensitivity must be positive, got {}",
                self.sensitivity
            )));
        }
        if !(self.contrast.is_finite() && self.contrast > 0.0) {
            return Err(SpectrogramError::InvalidConfig(format!(
                "contrast must be positive, got {}",
                self.contrast
            )));
        }
        Ok(())
    }

    pub fn shape(&self, raw: u8) -> u8 {
        shape(raw, self.sensitivity, self.contrast)
    }
}

/// `((raw / 255) * sensitivity) ^ contrast * 255`, clamped to `0..=255`.
///
/// A zero base always yields 0, including `0 ^ 0`.
pub fn shape(raw: u8, sensitivity: f32, contrast: f32) -> u8 {
    let base = raw as f32 / 255.0 * sensitivity;
    if base.is_nan() || base <= 0.0 {
        return 0;
    }
    let value = base.powf(contrast) * 255.0;
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as u8
}
