use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::audio::analysis::AnalyserSettings;
use crate::encode::image_file::ExportFormat;
use crate::render::export::ExportOptions;
use crate::render::spectrogram::{column_width_from_zoom, RenderSettings};
use crate::spectrum::axis::{AxisConfig, AxisScale};
use crate::spectrum::palette::{ColorStop, Palette, PaletteRegistry};
use crate::spectrum::shape::ShapeConfig;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub palettes: BTreeMap<String, PaletteConfig>,
}

#[derive(Debug, Deserialize)]
pub struct CanvasConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    #[serde(default = "default_min_decibels")]
    pub min_decibels: f32,
    #[serde(default = "default_max_decibels")]
    pub max_decibels: f32,
}

/// Values of the display controls, in the units the controls use
/// (percentages for sensitivity, contrast and zoom).
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default)]
    pub scale: AxisScale,
    #[serde(default)]
    pub min_freq: f32,
    /// Defaults to the Nyquist frequency of the input.
    #[serde(default)]
    pub max_freq: Option<f32>,
    #[serde(default = "default_percent")]
    pub sensitivity: f32,
    #[serde(default = "default_percent")]
    pub contrast: f32,
    #[serde(default = "default_percent")]
    pub zoom: f32,
    #[serde(default = "default_palette")]
    pub palette: String,
}

#[derive(Debug, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_legend")]
    pub legend: bool,
    #[serde(default = "default_legend_swatches")]
    pub legend_swatches: u32,
    #[serde(default)]
    pub format: ExportFormat,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
}

#[derive(Debug, Deserialize)]
pub struct PaletteConfig {
    pub stops: Vec<ColorStop>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            fps: default_fps(),
            smoothing: default_smoothing(),
            min_decibels: default_min_decibels(),
            max_decibels: default_max_decibels(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            scale: AxisScale::default(),
            min_freq: 0.0,
            max_freq: None,
            sensitivity: default_percent(),
            contrast: default_percent(),
            zoom: default_percent(),
            palette: default_palette(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: None,
            legend: default_legend(),
            legend_swatches: default_legend_swatches(),
            format: ExportFormat::default(),
            font_size: default_font_size(),
        }
    }
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 300 }
fn default_fft_size() -> usize { 2048 }
fn default_fps() -> u32 { 60 }
fn default_smoothing() -> f32 { 0.8 }
fn default_min_decibels() -> f32 { -100.0 }
fn default_max_decibels() -> f32 { -30.0 }
fn default_percent() -> f32 { 100.0 }
fn default_palette() -> String { "grayscale".into() }
fn default_legend() -> bool { true }
fn default_legend_swatches() -> u32 { 8 }
fn default_font_size() -> f32 { 11.0 }

impl Config {
    /// Built-in palettes plus every `[palettes.<name>]` table.
    pub fn palette_registry(&self) -> crate::Result<PaletteRegistry> {
        let mut registry = PaletteRegistry::new();
        for (name, palette) in &self.palettes {
            registry.register(name, Palette::from_stops(palette.stops.clone())?)?;
        }
        Ok(registry)
    }
}

impl AnalysisConfig {
    pub fn analyser_settings(&self) -> AnalyserSettings {
        AnalyserSettings {
            fft_size: self.fft_size,
            smoothing: self.smoothing,
            min_decibels: self.min_decibels,
            max_decibels: self.max_decibels,
        }
    }
}

impl DisplayConfig {
    /// Resolve control values into render settings for a given input rate.
    pub fn render_settings(&self, sample_rate: u32, palettes: &PaletteRegistry) -> crate::Result<RenderSettings> {
        let axis = AxisConfig {
            scale: self.scale,
            min_freq: self.min_freq,
            max_freq: self.max_freq.unwrap_or(sample_rate as f32 / 2.0),
            sample_rate,
        };
        let settings = RenderSettings {
            axis,
            shape: ShapeConfig::from_percent(self.sensitivity, self.contrast),
            palette: palettes.get(&self.palette)?,
            column_width: column_width_from_zoom(self.zoom),
        };
        settings.validate()?;
        Ok(settings)
    }
}

impl ExportConfig {
    pub fn export_options(&self, seconds_per_column: f32) -> ExportOptions {
        ExportOptions {
            title: self.title.clone(),
            legend: self.legend,
            legend_swatches: self.legend_swatches,
            seconds_per_column,
            font_size: self.font_size,
            ..ExportOptions::default()
        }
    }
}

/// Explicit path, or `spectrograph.toml` in the working directory, or the
/// user config directory.
pub fn discover_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("spectrograph.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("spectrograph").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("spectrograph").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config {}", path.display()))
}

pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}
