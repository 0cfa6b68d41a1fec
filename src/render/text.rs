use fontdue::{Font, FontSettings};

use super::raster::{Raster, Rgba};

const FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSansMono.ttf");

pub struct TextOverlay {
    font: Font,
    font_size: f32,
}

impl TextOverlay {
    pub fn new(font_size: f32) -> Self {
        let font = Font::from_bytes(FONT_DATA, FontSettings::default())
            .expect("Failed to load embedded font");
        Self { font, font_size }
    }

    pub fn line_height(&self) -> u32 {
        self.font_size.ceil() as u32
    }

    /// Draw text with its top-left corner at (`x`, `y`), clipped to the raster.
    pub fn composite(&self, raster: &mut Raster, text: &str, x: i32, y: i32, color: Rgba) {
        let mut cursor_x = x;
        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, self.font_size);
            let glyph_y = y + self.font_size as i32 - metrics.height as i32 - metrics.ymin;

            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let coverage = bitmap[gy * metrics.width + gx];
                    if coverage == 0 {
                        continue;
                    }

                    let px = cursor_x + metrics.xmin + gx as i32;
                    let py = glyph_y + gy as i32;
                    if px < 0 || py < 0 {
                        continue;
                    }

                    let alpha = (coverage as u32 * color[3] as u32 / 255) as u8;
                    raster.blend_pixel(px as u32, py as u32, [color[0], color[1], color[2], alpha]);
                }
            }

            cursor_x += metrics.advance_width.round() as i32;
        }
    }

    /// Width of rendered text in pixels.
    pub fn measure_width(&self, text: &str) -> u32 {
        let width: f32 = text
            .chars()
            .map(|ch| self.font.metrics(ch, self.font_size).advance_width)
            .sum();
        width.ceil() as u32
    }
}
