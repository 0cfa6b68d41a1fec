use super::raster::{Raster, Rgba};
use super::scroll::ScrollBuffer;
use crate::error::{Result, SpectrogramError};
use crate::spectrum::axis::{AxisConfig, AxisMapper};
use crate::spectrum::frame::FrequencyFrame;
use crate::spectrum::palette::Palette;
use crate::spectrum::shape::ShapeConfig;

/// Pixel width of one appended column for a zoom percentage (100% == 1px).
pub fn column_width_from_zoom(zoom_percent: f32) -> u32 {
    if !zoom_percent.is_finite() {
        return 1;
    }
    ((zoom_percent / 100.0).floor() as u32).max(1)
}

/// Resolved display parameters, read once per tick.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderSettings {
    pub axis: AxisConfig,
    pub shape: ShapeConfig,
    pub palette: Palette,
    pub column_width: u32,
}

impl RenderSettings {
    pub fn validate(&self) -> Result<()> {
        self.axis.validate()?;
        self.shape.validate()?;
        if self.column_width == 0 {
            return Err(SpectrogramError::InvalidConfig(
                "column width must be at least 1 pixel".into(),
            ));
        }
        Ok(())
    }
}

/// Settings compiled for one drawable height and frame length: a row→bin
/// table and a magnitude→colour table, so drawing a column is two lookups
/// per row.
#[derive(Clone, Debug)]
pub struct ColumnRenderer {
    settings: RenderSettings,
    bins: usize,
    rows: Vec<usize>,
    colors: [Rgba; 256],
}

impl ColumnRenderer {
    pub fn new(settings: &RenderSettings, height: u32, bins: usize) -> Result<Self> {
        settings.validate()?;
        let mapper = AxisMapper::new(&settings.axis, height, bins)?;
        let palette = settings.palette.table();

        let mut colors = [[0u8; 4]; 256];
        for (raw, color) in colors.iter_mut().enumerate() {
            let [r, g, b] = palette[settings.shape.shape(raw as u8) as usize];
            *color = [r, g, b, 255];
        }

        Ok(Self {
            settings: settings.clone(),
            bins,
            rows: mapper.row_table(),
            colors,
        })
    }

    fn matches(&self, settings: &RenderSettings, height: u32, bins: usize) -> bool {
        self.bins == bins && self.rows.len() == height as usize && self.settings == *settings
    }

    /// Colours for every row, bottom row first.
    pub fn render(&self, frame: &FrequencyFrame, strip: &mut Vec<Rgba>) {
        strip.clear();
        strip.extend(self.rows.iter().map(|&bin| self.colors[frame.sample(bin) as usize]));
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
}

/// Live raster of one channel plus what it needs to draw the next column.
#[derive(Debug)]
pub struct SpectrogramState {
    buffer: ScrollBuffer,
    state: SessionState,
    renderer: Option<ColumnRenderer>,
    strip: Vec<Rgba>,
}

impl SpectrogramState {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Ok(Self::from_buffer(ScrollBuffer::new(width, height)?))
    }

    pub(crate) fn from_buffer(buffer: ScrollBuffer) -> Self {
        Self {
            strip: Vec::with_capacity(buffer.height() as usize),
            buffer,
            state: SessionState::Idle,
            renderer: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn buffer(&self) -> &ScrollBuffer {
        &self.buffer
    }

    /// Render `frame` as the newest column. Empty frames are skipped.
    pub fn append_column(&mut self, frame: &FrequencyFrame, settings: &RenderSettings) -> Result<()> {
        if frame.is_empty() {
            return Ok(());
        }

        let height = self.buffer.height();
        let stale = !matches!(&self.renderer, Some(r) if r.matches(settings, height, frame.len()));
        if stale {
            self.renderer = Some(ColumnRenderer::new(settings, height, frame.len())?);
            log::debug!(
                "column renderer rebuilt: {} scale, {} bins, {} rows",
                settings.axis.scale,
                frame.len(),
                height
            );
        }

        if let Some(renderer) = &self.renderer {
            renderer.render(frame, &mut self.strip);
            self.buffer.push_column(&self.strip, settings.column_width);
        }
        self.state = SessionState::Active;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = SessionState::Idle;
    }

    pub(crate) fn stop(&mut self) {
        self.state = SessionState::Idle;
    }

    /// Swap in a freshly allocated buffer. History is dropped, never rescaled.
    pub(crate) fn replace_buffer(&mut self, buffer: ScrollBuffer) {
        self.buffer = buffer;
        self.renderer = None;
        self.state = SessionState::Idle;
    }

    pub fn snapshot(&self) -> Result<Raster> {
        self.buffer.snapshot()
    }
}
