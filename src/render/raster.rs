use crate::error::{Result, SpectrogramError};

pub type Rgba = [u8; 4];

pub const TRANSPARENT: Rgba = [0, 0, 0, 0];

/// Zeroed RGBA storage for a `width` x `height` grid, or an allocation error.
pub(crate) fn allocate(width: u32, height: u32) -> Result<Vec<u8>> {
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or(SpectrogramError::Allocation { width, height })?;

    let mut pixels = Vec::new();
    pixels
        .try_reserve_exact(len)
        .map_err(|_| SpectrogramError::Allocation { width, height })?;
    pixels.resize(len, 0);
    Ok(pixels)
}

/// Row-major RGBA pixel grid, origin at the top-left.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Raster {
    /// Fully transparent raster.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Ok(Self {
            width,
            height,
            pixels: allocate(width, height)?,
        })
    }

    pub fn filled(width: u32, height: u32, color: Rgba) -> Result<Self> {
        let mut raster = Self::new(width, height)?;
        raster.fill(color);
        Ok(raster)
    }

    pub(crate) fn from_parts(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * 4);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// Overwrite one pixel; out-of-bounds writes are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.offset(x, y);
        self.pixels[i..i + 4].copy_from_slice(&color);
    }

    /// Alpha-blend `color` over one pixel, result is opaque.
    pub fn blend_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.offset(x, y);
        let a = color[3] as f32 / 255.0;
        let inv_a = 1.0 - a;
        for c in 0..3 {
            self.pixels[i + c] = (color[c] as f32 * a + self.pixels[i + c] as f32 * inv_a) as u8;
        }
        self.pixels[i + 3] = 255;
    }

    pub fn fill(&mut self, color: Rgba) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
    }

    /// Fill a rectangle, clipped to the raster.
    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgba) {
        let x_end = x.saturating_add(w).min(self.width);
        let y_end = y.saturating_add(h).min(self.height);
        for py in y.min(y_end)..y_end {
            for px in x.min(x_end)..x_end {
                self.put_pixel(px, py, color);
            }
        }
    }

    /// Composite `src` over this raster with its top-left corner at
    /// (`x`, `y`), clipped. Transparent source pixels leave the target as is.
    pub fn draw_over(&mut self, src: &Raster, x: u32, y: u32) {
        for sy in 0..src.height {
            for sx in 0..src.width {
                let i = src.offset(sx, sy);
                let color = [src.pixels[i], src.pixels[i + 1], src.pixels[i + 2], src.pixels[i + 3]];
                let (tx, ty) = (x.saturating_add(sx), y.saturating_add(sy));
                match color[3] {
                    0 => {}
                    255 => self.put_pixel(tx, ty, color),
                    _ => self.blend_pixel(tx, ty, color),
                }
            }
        }
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|&b| b == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_raster_is_transparent() {
        let raster = Raster::new(4, 3).unwrap();
        assert_eq!(raster.pixels().len(), 4 * 3 * 4);
        assert!(raster.is_blank());
        assert_eq!(raster.pixel(3, 2), Some(TRANSPARENT));
        assert_eq!(raster.pixel(4, 0), None);
    }

    #[test]
    fn absurd_sizes_fail_instead_of_aborting() {
        let err = Raster::new(u32::MAX, u32::MAX).unwrap_err();
        assert!(matches!(err, SpectrogramError::Allocation { .. }));
    }

    #[test]
    fn fill_rect_clips_to_bounds() {
        let mut raster = Raster::new(4, 4).unwrap();
        raster.fill_rect(2, 2, 10, 10, [9, 9, 9, 255]);
        assert_eq!(raster.pixel(1, 1), Some(TRANSPARENT));
        assert_eq!(raster.pixel(2, 2), Some([9, 9, 9, 255]));
        assert_eq!(raster.pixel(3, 3), Some([9, 9, 9, 255]));
    }

    #[test]
    fn draw_over_copies_opaque_and_skips_transparent() {
        let mut src = Raster::filled(3, 2, [1, 2, 3, 255]).unwrap();
        src.put_pixel(0, 0, TRANSPARENT);
        let mut dst = Raster::filled(4, 4, [7, 7, 7, 255]).unwrap();
        dst.draw_over(&src, 2, 3);
        assert_eq!(dst.pixel(2, 3), Some([7, 7, 7, 255]));
        assert_eq!(dst.pixel(3, 3), Some([1, 2, 3, 255]));
        assert_eq!(dst.pixel(1, 3), Some([7, 7, 7, 255]));
        assert_eq!(dst.pixel(3, 2), Some([7, 7, 7, 255]));
    }

    #[test]
    fn blend_mixes_by_alpha() {
        let mut raster = Raster::filled(1, 1, [0, 0, 0, 255]).unwrap();
        raster.blend_pixel(0, 0, [255, 255, 255, 255]);
        assert_eq!(raster.pixel(0, 0), Some([255, 255, 255, 255]));

        let mut raster = Raster::filled(1, 1, [0, 0, 0, 255]).unwrap();
        raster.blend_pixel(0, 0, [200, 100, 0, 0]);
        assert_eq!(raster.pixel(0, 0), Some([0, 0, 0, 255]));
    }
}
