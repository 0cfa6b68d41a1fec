//! Composites finished spectrogram rasters into a labelled image.
//!
//! Layout, top to bottom: title row, then for each channel a label row and
//! the channel raster, then the time axis. Frequency labels sit in the left
//! margin; the optional colour legend sits to the right of the rasters.

use super::raster::{Raster, Rgba};
use super::text::TextOverlay;
use crate::error::{Result, SpectrogramError};
use crate::spectrum::axis::{format_frequency, AxisMapper};
use crate::spectrum::palette::Palette;

const TITLE_HEIGHT: u32 = 24;
const LABEL_ROW_HEIGHT: u32 = 20;
const MARGIN_LEFT: u32 = 64;
const MARGIN_RIGHT: u32 = 8;
const MARGIN_BOTTOM: u32 = 28;
const LEGEND_WIDTH: u32 = 64;
const SWATCH_WIDTH: u32 = 14;
const TICK_LENGTH: u32 = 4;

/// Frequency ticks are placed at `i / FREQ_DIVISIONS` up the axis.
pub const FREQ_DIVISIONS: u32 = 5;
pub const TIME_DIVISIONS: u32 = 5;
/// One swatch per distinct intensity at most.
pub const MAX_LEGEND_SWATCHES: u32 = 256;

/// One channel's raster and the label drawn above it.
#[derive(Clone, Debug)]
pub struct ChannelImage {
    pub label: String,
    pub raster: Raster,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExportOptions {
    pub title: Option<String>,
    pub legend: bool,
    /// Number of discrete swatches in the legend.
    pub legend_swatches: u32,
    /// Time covered by one pixel column, for the time axis labels.
    pub seconds_per_column: f32,
    pub font_size: f32,
    pub background: Rgba,
    pub text_color: Rgba,
    pub grid_color: Rgba,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            title: None,
            legend: true,
            legend_swatches: 8,
            seconds_per_column: 1.0 / 60.0,
            font_size: 11.0,
            background: [0x1a, 0x1a, 0x1a, 255],
            text_color: [0xaa, 0xaa, 0xaa, 255],
            grid_color: [255, 255, 255, 64],
        }
    }
}

impl ExportOptions {
    pub fn validate(&self) -> Result<()> {
        if !(2..=MAX_LEGEND_SWATCHES).contains(&self.legend_swatches) {
            return Err(SpectrogramError::InvalidConfig(format!(
                "legend needs 2-{} swatches, got {}",
                MAX_LEGEND_SWATCHES, self.legend_swatches
            )));
        }
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(SpectrogramError::InvalidConfig(format!(
                "font size must be positive, got {}",
                self.font_size
            )));
        }
        Ok(())
    }
}

/// A labelled frequency gridline. `y` counts down from the top of the
/// channel raster.
#[derive(Clone, Debug, PartialEq)]
pub struct FreqTick {
    pub freq: f32,
    pub y: u32,
    pub label: String,
}

/// Frequency ticks for one channel raster, lowest frequency first.
///
/// Rows come from [`AxisMapper::row_for_freq`], the exact inverse of the
/// mapping used to sample the data.
pub fn frequency_ticks(mapper: &AxisMapper) -> Vec<FreqTick> {
    let height = mapper.height();
    (0..=FREQ_DIVISIONS)
        .map(|i| {
            let freq = mapper.freq_at_fraction(i as f32 / FREQ_DIVISIONS as f32);
            let row = mapper.row_for_freq(freq).round().clamp(0.0, (height - 1) as f32) as u32;
            FreqTick {
                freq,
                y: height - 1 - row,
                label: format_frequency(freq),
            }
        })
        .collect()
}

/// `"0s"` for the newest column, `"-2.5s"` for older ones.
pub fn format_seconds(seconds: f32) -> String {
    if seconds.abs() < 0.05 {
        "0s".to_string()
    } else {
        format!("{:.1}s", seconds)
    }
}

pub struct ExportCompositor {
    options: ExportOptions,
    text: TextOverlay,
}

impl ExportCompositor {
    pub fn new(options: ExportOptions) -> Self {
        let text = TextOverlay::new(options.font_size);
        Self { options, text }
    }

    /// Output size for `channels` rasters of `width` x `height`.
    pub fn output_size(&self, channels: u32, width: u32, height: u32) -> (u32, u32) {
        let legend = if self.options.legend { LEGEND_WIDTH } else { 0 };
        (
            MARGIN_LEFT + width + MARGIN_RIGHT + legend,
            TITLE_HEIGHT + channels * (LABEL_ROW_HEIGHT + height) + MARGIN_BOTTOM,
        )
    }

    /// Top edge of channel `index`'s raster in the output.
    fn channel_top(&self, index: u32, height: u32) -> u32 {
        TITLE_HEIGHT + index * (LABEL_ROW_HEIGHT + height) + LABEL_ROW_HEIGHT
    }

    /// Build the composite. `mapper` must describe the rasters' height.
    pub fn compose(&self, channels: &[ChannelImage], mapper: &AxisMapper, palette: &Palette) -> Result<Raster> {
        self.options.validate()?;
        let first = channels.first().ok_or_else(|| {
            SpectrogramError::InvalidConfig("nothing to export: no channels".into())
        })?;
        let (width, height) = (first.raster.width(), first.raster.height());
        if width == 0 || height == 0 {
            return Err(SpectrogramError::InvalidConfig("cannot export an empty raster".into()));
        }
        if channels
            .iter()
            .any(|c| c.raster.width() != width || c.raster.height() != height)
        {
            return Err(SpectrogramError::InvalidConfig(
                "all exported channels must share one size".into(),
            ));
        }
        if mapper.height() != height {
            return Err(SpectrogramError::InvalidConfig(format!(
                "axis describes {} rows but rasters have {}",
                mapper.height(),
                height
            )));
        }

        let (out_w, out_h) = self.output_size(channels.len() as u32, width, height);
        let mut out = Raster::filled(out_w, out_h, self.options.background)?;

        if let Some(title) = &self.options.title {
            let y = (TITLE_HEIGHT.saturating_sub(self.text.line_height()) / 2) as i32;
            self.text.composite(&mut out, title, MARGIN_LEFT as i32, y, self.options.text_color);
        }

        let freq_ticks = frequency_ticks(mapper);
        let time_xs = time_tick_columns(width);

        for (index, channel) in channels.iter().enumerate() {
            let top = self.channel_top(index as u32, height);
            let label_y = top - LABEL_ROW_HEIGHT + (LABEL_ROW_HEIGHT.saturating_sub(self.text.line_height())) / 2;
            self.text
                .composite(&mut out, &channel.label, 10, label_y as i32, self.options.text_color);

            out.draw_over(&channel.raster, MARGIN_LEFT, top);
            self.draw_frequency_axis(&mut out, &freq_ticks, top, width);
            for &x in &time_xs {
                for y in top..top + height {
                    out.blend_pixel(MARGIN_LEFT + x, y, self.options.grid_color);
                }
            }
        }

        let data_bottom = self.channel_top(channels.len() as u32 - 1, height) + height;
        self.draw_time_axis(&mut out, &time_xs, width, data_bottom);

        if self.options.legend {
            let top = self.channel_top(0, height);
            self.draw_legend(&mut out, palette, top, data_bottom - top, width);
        }

        log::info!(
            "Exported {} channel(s) into {}x{} image",
            channels.len(),
            out_w,
            out_h
        );
        Ok(out)
    }

    fn draw_frequency_axis(&self, out: &mut Raster, ticks: &[FreqTick], top: u32, width: u32) {
        let line_height = self.text.line_height();
        for tick in ticks {
            let y = top + tick.y;
            for x in 0..width {
                out.blend_pixel(MARGIN_LEFT + x, y, self.options.grid_color);
            }
            out.fill_rect(MARGIN_LEFT - TICK_LENGTH, y, TICK_LENGTH, 1, self.options.text_color);

            let label_w = self.text.measure_width(&tick.label);
            let label_x = MARGIN_LEFT.saturating_sub(TICK_LENGTH + 2 + label_w);
            let label_y = (y as i32 - line_height as i32 / 2).max(0);
            self.text
                .composite(out, &tick.label, label_x as i32, label_y, self.options.text_color);
        }
    }

    fn draw_time_axis(&self, out: &mut Raster, columns: &[u32], width: u32, bottom: u32) {
        for &x in columns {
            let px = MARGIN_LEFT + x;
            out.fill_rect(px, bottom, 1, TICK_LENGTH, self.options.text_color);

            let seconds = -((width - 1 - x) as f32) * self.options.seconds_per_column;
            let label = format_seconds(seconds);
            let label_w = self.text.measure_width(&label);
            let label_x = (px as i32 - label_w as i32 / 2).max(0);
            self.text.composite(
                out,
                &label,
                label_x,
                (bottom + TICK_LENGTH + 2) as i32,
                self.options.text_color,
            );
        }
    }

    fn draw_legend(&self, out: &mut Raster, palette: &Palette, top: u32, span: u32, width: u32) {
        let swatches = self.options.legend_swatches;
        let x = MARGIN_LEFT + width + MARGIN_RIGHT;
        let line_height = self.text.line_height();

        for i in 0..swatches {
            // Swatch 0 (intensity 0) at the bottom; bounds stay within [top, top + span).
            let (y0, y1) = swatch_rows(i, swatches, top, span);
            if y1 == y0 {
                continue;
            }
            let intensity = legend_intensity(i, swatches);
            let [r, g, b] = palette.color_of(intensity);
            out.fill_rect(x, y0, SWATCH_WIDTH, y1 - y0, [r, g, b, 255]);

            let is_end = i == 0 || i == swatches - 1;
            if y1 - y0 >= line_height || is_end {
                let label_y = y0 as i32 + ((y1 - y0) as i32 - line_height as i32) / 2;
                self.text.composite(
                    out,
                    &intensity.to_string(),
                    (x + SWATCH_WIDTH + 4) as i32,
                    label_y,
                    self.options.text_color,
                );
            }
        }
    }
}

/// Rows `[y0, y1)` of swatch `index`, counted up from the bottom of `span`.
/// Swatches split the span proportionally, so some are empty when there are
/// more swatches than rows.
fn swatch_rows(index: u32, count: u32, top: u32, span: u32) -> (u32, u32) {
    let edge = |k: u32| top + (span as u64 * k as u64 / count as u64) as u32;
    (edge(count - index - 1), edge(count - index))
}

/// Intensity shown by swatch `index` of `count`, from 0 up to 255.
pub fn legend_intensity(index: u32, count: u32) -> u8 {
    if count <= 1 {
        return 0;
    }
    (index as f32 * 255.0 / (count - 1) as f32).round() as u8
}

fn time_tick_columns(width: u32) -> Vec<u32> {
    (0..=TIME_DIVISIONS)
        .map(|i| ((i as f32 / TIME_DIVISIONS as f32) * (width - 1) as f32).round() as u32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::axis::{AxisConfig, AxisScale};

    fn mapper(scale: AxisScale, height: u32) -> AxisMapper {
        let cfg = AxisConfig {
            scale,
            min_freq: 0.0,
            max_freq: 22050.0,
            sample_rate: 44100,
        };
        AxisMapper::new(&cfg, height, 1024).unwrap()
    }

    fn channel(label: &str, width: u32, height: u32, color: Rgba) -> ChannelImage {
        ChannelImage {
            label: label.into(),
            raster: Raster::filled(width, height, color).unwrap(),
        }
    }

    #[test]
    fn ticks_sit_on_the_rows_of_their_frequency() {
        for scale in [AxisScale::Linear, AxisScale::Logarithmic, AxisScale::Mel] {
            let m = mapper(scale, 300);
            let ticks = frequency_ticks(&m);
            assert_eq!(ticks.len(), FREQ_DIVISIONS as usize + 1);
            for tick in &ticks {
                let row_from_bottom = (m.height() - 1 - tick.y) as f32;
                let data_freq = m.freq_at_row(row_from_bottom);
                let row_of_tick = m.row_for_freq(tick.freq).min((m.height() - 1) as f32);
                assert!((row_of_tick - row_from_bottom).abs() <= 1.0);
                assert!((m.row_for_freq(data_freq) - row_from_bottom).abs() < 1e-2);
            }
            assert_eq!(ticks[0].y, 299, "lowest tick at the bottom for {:?}", scale);
            assert_eq!(ticks.last().map(|t| t.y), Some(0));
        }
    }

    #[test]
    fn linear_ticks_are_evenly_spaced() {
        let labels: Vec<String> = frequency_ticks(&mapper(AxisScale::Linear, 300))
            .into_iter()
            .map(|t| t.label)
            .collect();
        assert_eq!(labels[..5], ["0 Hz", "4.4kHz", "8.8kHz", "13.2kHz", "17.6kHz"]);
        assert!(labels[5].starts_with("22."));
    }

    #[test]
    fn stereo_output_stacks_channels() {
        let compositor = ExportCompositor::new(ExportOptions::default());
        let channels = vec![
            channel("LEFT CHANNEL", 200, 100, [255, 0, 0, 255]),
            channel("RIGHT CHANNEL", 200, 100, [0, 0, 255, 255]),
        ];
        let out = compositor
            .compose(&channels, &mapper(AxisScale::Linear, 100), &Palette::Heated)
            .unwrap();

        assert_eq!(
            (out.width(), out.height()),
            (MARGIN_LEFT + 200 + MARGIN_RIGHT + LEGEND_WIDTH, TITLE_HEIGHT + 2 * 120 + MARGIN_BOTTOM)
        );

        // Sample away from gridlines: x = 10 and row 37 of each raster.
        let left_top = compositor.channel_top(0, 100);
        let right_top = compositor.channel_top(1, 100);
        assert_eq!(out.pixel(MARGIN_LEFT + 10, left_top + 37), Some([255, 0, 0, 255]));
        assert_eq!(out.pixel(MARGIN_LEFT + 10, right_top + 37), Some([0, 0, 255, 255]));
    }

    #[test]
    fn gridlines_are_drawn_on_tick_rows() {
        let compositor = ExportCompositor::new(ExportOptions::default());
        let channels = vec![channel("MONO", 50, 60, [0, 0, 0, 255])];
        let m = mapper(AxisScale::Mel, 60);
        let out = compositor.compose(&channels, &m, &Palette::Grayscale).unwrap();
        let top = compositor.channel_top(0, 60);

        for tick in frequency_ticks(&m) {
            let px = out.pixel(MARGIN_LEFT + 20, top + tick.y).unwrap();
            assert!(px[0] > 0, "no gridline at row {} ({} Hz)", tick.y, tick.freq);
        }
    }

    #[test]
    fn legend_shows_palette_swatches() {
        let options = ExportOptions {
            legend_swatches: 4,
            ..ExportOptions::default()
        };
        let compositor = ExportCompositor::new(options);
        let channels = vec![channel("MONO", 40, 200, [0, 0, 0, 255])];
        let out = compositor
            .compose(&channels, &mapper(AxisScale::Linear, 200), &Palette::Heated)
            .unwrap();

        let x = MARGIN_LEFT + 40 + MARGIN_RIGHT + 2;
        let top = compositor.channel_top(0, 200);
        let [r, g, b] = Palette::Heated.color_of(255);
        assert_eq!(out.pixel(x, top + 2), Some([r, g, b, 255]));
        let [r, g, b] = Palette::Heated.color_of(0);
        assert_eq!(out.pixel(x, top + 198), Some([r, g, b, 255]));
    }

    #[test]
    fn legend_can_be_disabled() {
        let compositor = ExportCompositor::new(ExportOptions {
            legend: false,
            ..ExportOptions::default()
        });
        assert_eq!(compositor.output_size(1, 100, 50).0, MARGIN_LEFT + 100 + MARGIN_RIGHT);
    }

    #[test]
    fn rejects_mismatched_inputs() {
        let compositor = ExportCompositor::new(ExportOptions::default());
        let channels = vec![channel("L", 10, 10, [0; 4]), channel("R", 12, 10, [0; 4])];
        assert!(compositor
            .compose(&channels, &mapper(AxisScale::Linear, 10), &Palette::Grayscale)
            .is_err());

        let channels = vec![channel("L", 10, 10, [0; 4])];
        assert!(compositor
            .compose(&channels, &mapper(AxisScale::Linear, 20), &Palette::Grayscale)
            .is_err());
        assert!(compositor
            .compose(&[], &mapper(AxisScale::Linear, 10), &Palette::Grayscale)
            .is_err());
    }

    #[test]
    fn time_labels() {
        assert_eq!(format_seconds(0.0), "0s");
        assert_eq!(format_seconds(-2.5), "-2.5s");
        assert_eq!(time_tick_columns(101), vec![0, 20, 40, 60, 80, 100]);
        assert_eq!(legend_intensity(0, 8), 0);
        assert_eq!(legend_intensity(7, 8), 255);
    }

    fn legend_column_above(out: &Raster, x: u32, top: u32, background: Rgba) -> bool {
        (0..top).all(|y| (x..x + SWATCH_WIDTH).all(|px| out.pixel(px, y) == Some(background)))
    }

    #[test]
    fn swatches_split_the_span_without_leaving_it() {
        for (count, span) in [(8, 4), (256, 100), (4, 200), (3, 10)] {
            let mut next = 100 + span;
            for i in 0..count {
                let (y0, y1) = swatch_rows(i, count, 100, span);
                assert!(100 <= y0 && y0 <= y1 && y1 <= 100 + span);
                assert_eq!(y1, next, "swatches must tile the span");
                next = y0;
            }
            assert_eq!(next, 100);
        }
    }

    #[test]
    fn legend_on_raster_shorter_than_swatch_count() {
        let options = ExportOptions::default();
        let background = options.background;
        let compositor = ExportCompositor::new(options);
        let channels = vec![channel("MONO", 40, 4, [255, 255, 255, 255])];
        let out = compositor
            .compose(&channels, &mapper(AxisScale::Linear, 4), &Palette::Heated)
            .unwrap();

        let x = MARGIN_LEFT + 40 + MARGIN_RIGHT;
        let top = compositor.channel_top(0, 4);
        assert!(legend_column_above(&out, x, top, background));
        let [r, g, b] = Palette::Heated.color_of(0);
        assert_eq!(out.pixel(x + 2, top + 3), Some([r, g, b, 255]));
        assert_ne!(out.pixel(x + 2, top), Some(background));
        assert_ne!(out.pixel(x + 2, top + 4), out.pixel(x + 2, top + 3));
    }

    #[test]
    fn legend_with_more_swatches_than_rows() {
        use crate::render::session::Spectrogram;
        use crate::render::spectrogram::RenderSettings;
        use crate::spectrum::shape::ShapeConfig;

        let settings = RenderSettings {
            axis: AxisConfig {
                scale: AxisScale::Linear,
                min_freq: 0.0,
                max_freq: 22050.0,
                sample_rate: 44100,
            },
            shape: ShapeConfig::default(),
            palette: Palette::Magma,
            column_width: 1,
        };
        let session = Spectrogram::new(Spectrogram::default_labels(1), 20, 100, settings).unwrap();
        let options = ExportOptions {
            legend_swatches: MAX_LEGEND_SWATCHES,
            ..ExportOptions::default()
        };
        let out = session.export(64, &options).unwrap();

        let x = MARGIN_LEFT + 20 + MARGIN_RIGHT;
        let compositor = ExportCompositor::new(options.clone());
        let top = compositor.channel_top(0, 100);
        assert!(legend_column_above(&out, x, top, options.background));
        assert_ne!(out.pixel(x + 2, top), Some(options.background));
        let [r, g, b] = Palette::Magma.color_of(0);
        assert_eq!(out.pixel(x + 2, top + 99), Some([r, g, b, 255]));

        for legend_swatches in [0, 1, 300] {
            let options = ExportOptions {
                legend_swatches,
                ..ExportOptions::default()
            };
            assert!(matches!(
                session.export(64, &options),
                Err(SpectrogramError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn session_export_gridlines_follow_sampled_bins() {
        use crate::render::session::Spectrogram;
        use crate::render::spectrogram::RenderSettings;
        use crate::spectrum::frame::{FrameQueue, FrequencyFrame};
        use crate::spectrum::shape::ShapeConfig;

        let (width, height, bins) = (30u32, 100u32, 512usize);
        for scale in [AxisScale::Logarithmic, AxisScale::Mel] {
            let settings = RenderSettings {
                axis: AxisConfig {
                    scale,
                    min_freq: 50.0,
                    max_freq: 20000.0,
                    sample_rate: 44100,
                },
                shape: ShapeConfig::default(),
                palette: Palette::Grayscale,
                column_width: 1,
            };
            let mut session =
                Spectrogram::new(Spectrogram::default_labels(1), width, height, settings.clone()).unwrap();
            let frames = (0..width).map(|_| vec![FrequencyFrame::new(vec![0u8; bins])]);
            assert_eq!(session.run(&mut FrameQueue::finished(frames)).unwrap(), width as usize);

            let out = session.export(bins, &ExportOptions::default()).unwrap();
            let mapper = AxisMapper::new(&settings.axis, height, bins).unwrap();
            let top = ExportCompositor::new(ExportOptions::default()).channel_top(0, height);
            let nyquist = settings.axis.nyquist() as f64;

            for tick in frequency_ticks(&mapper) {
                let px = out.pixel(MARGIN_LEFT + 3, top + tick.y).unwrap();
                assert!(px[0] > 0, "{:?}: no gridline for {} Hz", scale, tick.freq);

                let row = height - 1 - tick.y;
                let tick_bin = ((tick.freq as f64 / nyquist * bins as f64).floor() as usize).min(bins - 1);
                assert!(
                    mapper.bin_for_row(row) <= tick_bin,
                    "{:?}: row {} samples past {} Hz",
                    scale,
                    row,
                    tick.freq
                );
                if row + 1 < height {
                    assert!(
                        mapper.bin_for_row(row + 1) >= tick_bin,
                        "{:?}: gridline for {} Hz sits below its data row",
                        scale,
                        tick.freq
                    );
                }
            }
        }
    }
}
