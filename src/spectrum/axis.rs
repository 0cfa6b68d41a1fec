use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SpectrogramError};

/// Lowest frequency the logarithmic axis will map, keeps `log10` finite.
pub const LOG_FLOOR_HZ: f32 = 20.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisScale {
    #[default]
    Linear,
    #[serde(alias = "log")]
    Logarithmic,
    Mel,
}

impl AxisScale {
    pub fn name(&self) -> &'static str {
        match self {
            AxisScale::Linear => "linear",
            AxisScale::Logarithmic => "logarithmic",
            AxisScale::Mel => "mel",
        }
    }

    /// Map a frequency into the space the axis interpolates in.
    fn to_domain(self, freq: f32) -> f32 {
        match self {
            AxisScale::Linear => freq,
            AxisScale::Logarithmic => freq.max(LOG_FLOOR_HZ).log10(),
            AxisScale::Mel => hz_to_mel(freq),
        }
    }

    fn from_domain(self, value: f32) -> f32 {
        match self {
            AxisScale::Linear => value,
            AxisScale::Logarithmic => 10f32.powf(value),
            AxisScale::Mel => mel_to_hz(value),
        }
    }
}

impl FromStr for AxisScale {
    type Err = SpectrogramError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linear" | "lin" => Ok(AxisScale::Linear),
            "logarithmic" | "log" => Ok(AxisScale::Logarithmic),
            "mel" => Ok(AxisScale::Mel),
            other => Err(SpectrogramError::InvalidConfig(format!(
                "unknown frequency scale '{}' (expected linear, logarithmic or mel)",
                other
            ))),
        }
    }
}

impl fmt::Display for AxisScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn hz_to_mel(freq: f32) -> f32 {
    2595.0 * (1.0 + freq / 700.0).log10()
}

pub fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// Frequency bounds and scale of the vertical axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisConfig {
    pub scale: AxisScale,
    pub min_freq: f32,
    pub max_freq: f32,
    pub sample_rate: u32,
}

impl AxisConfig {
    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SpectrogramError::InvalidConfig(msg));

        if self.sample_rate == 0 {
            return invalid("sample rate must be positive".into());
        }
        if !self.min_freq.is_finite() || !self.max_freq.is_finite() {
            return invalid("frequency bounds must be finite".into());
        }
        if self.min_freq < 0.0 {
            return invalid(format!("min frequency {} Hz is negative", self.min_freq));
        }
        if self.min_freq >= self.max_freq {
            return invalid(format!(
                "min frequency {} Hz must be below max frequency {} Hz",
                self.min_freq, self.max_freq
            ));
        }
        if self.max_freq > self.nyquist() {
            return invalid(format!(
                "max frequency {} Hz exceeds Nyquist ({} Hz)",
                self.max_freq,
                self.nyquist()
            ));
        }
        if self.scale == AxisScale::Logarithmic && self.max_freq <= LOG_FLOOR_HZ {
            return invalid(format!(
                "logarithmic scale needs a max frequency above {} Hz",
                LOG_FLOOR_HZ
            ));
        }
        Ok(())
    }
}

/// Row/frequency/bin conversions for one axis configuration, one drawable
/// height and one frame length.
///
/// Row 0 is the bottom of the drawable area (lowest frequency). The forward
/// direction (`freq_at_row`, `bin_for_row`) and the inverse (`row_for_freq`)
/// interpolate over the same `[lo, hi]` range so gridlines drawn with the
/// inverse line up with the data.
#[derive(Clone, Debug)]
pub struct AxisMapper {
    scale: AxisScale,
    height: u32,
    bins: usize,
    nyquist: f32,
    min_bin: usize,
    max_bin: usize,
    lo: f32,
    hi: f32,
}

impl AxisMapper {
    pub fn new(config: &AxisConfig, height: u32, bins: usize) -> Result<Self> {
        config.validate()?;
        if height == 0 {
            return Err(SpectrogramError::InvalidConfig("axis height must be positive".into()));
        }
        if bins == 0 {
            return Err(SpectrogramError::InvalidConfig("frame must have at least one bin".into()));
        }

        let nyquist = config.nyquist();
        let min_bin = (config.min_freq / nyquist * bins as f32).floor() as usize;
        let max_bin = (config.max_freq / nyquist * bins as f32).floor() as usize;

        // The linear axis covers exactly the bins it samples from.
        let (lo, hi) = match config.scale {
            AxisScale::Linear => {
                let bin_hz = nyquist / bins as f32;
                (min_bin as f32 * bin_hz, max_bin as f32 * bin_hz)
            }
            scale => (scale.to_domain(config.min_freq), scale.to_domain(config.max_freq)),
        };

        Ok(Self {
            scale: config.scale,
            height,
            bins,
            nyquist,
            min_bin,
            max_bin,
            lo,
            hi,
        })
    }

    pub fn scale(&self) -> AxisScale {
        self.scale
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Frequency at a fractional position `0.0..=1.0` up the axis.
    pub fn freq_at_fraction(&self, fraction: f32) -> f32 {
        self.scale.from_domain(self.lo + fraction * (self.hi - self.lo))
    }

    pub fn freq_at_row(&self, y: f32) -> f32 {
        self.freq_at_fraction(y / self.height as f32)
    }

    /// Inverse of [`freq_at_row`](Self::freq_at_row). Not clamped: frequencies
    /// outside the configured range land outside `[0, height)`.
    pub fn row_for_freq(&self, freq: f32) -> f32 {
        let span = self.hi - self.lo;
        if span <= 0.0 {
            return 0.0;
        }
        (self.scale.to_domain(freq) - self.lo) / span * self.height as f32
    }

    /// Bin index sampled for pixel row `y`, clamped to `[0, bins - 1]`.
    pub fn bin_for_row(&self, y: u32) -> usize {
        let fraction = y as f64 / self.height as f64;
        let index = match self.scale {
            AxisScale::Linear => {
                let span = self.max_bin as f64 - self.min_bin as f64;
                (self.min_bin as f64 + fraction * span).floor()
            }
            _ => {
                let freq = self.freq_at_row(y as f32) as f64;
                (freq / self.nyquist as f64 * self.bins as f64).floor()
            }
        };
        clamp_index(index, self.bins)
    }

    /// Bin index for every row, bottom row first.
    pub fn row_table(&self) -> Vec<usize> {
        (0..self.height).map(|y| self.bin_for_row(y)).collect()
    }
}

fn clamp_index(index: f64, bins: usize) -> usize {
    if !index.is_finite() || index <= 0.0 {
        0
    } else {
        (index as usize).min(bins - 1)
    }
}

/// Tick label text: `"440 Hz"` below 1 kHz, `"2.5kHz"` at or above.
pub fn format_frequency(freq: f32) -> String {
    if freq >= 1000.0 {
        format!("{:.1}kHz", freq / 1000.0)
    } else {
        format!("{} Hz", freq.round() as i64)
    }
}
