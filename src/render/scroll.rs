use super::raster::{allocate, Raster, Rgba};
use crate::error::{Result, SpectrogramError};

/// Fixed-width scrolling window of pixel columns.
///
/// Columns live in a ring: appending overwrites the oldest column and moves
/// the ring head, so the cost of an append depends only on the height and
/// the column width, never on how much history has scrolled past. Logically
/// the window behaves as if its contents shift left by one column per
/// appended column, with the newest column at `x == width - 1`.
#[derive(Debug)]
pub struct ScrollBuffer {
    width: u32,
    height: u32,
    /// Column-major storage, `height * 4` bytes per column, top row first.
    columns: Vec<u8>,
    /// Physical index of the logical leftmost (oldest) column.
    head: u32,
}

impl ScrollBuffer {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SpectrogramError::InvalidConfig(format!(
                "spectrogram size must be non-zero, got {}x{}",
                width, height
            )));
        }
        Ok(Self {
            width,
            height,
            columns: allocate(width, height)?,
            head: 0,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn stride(&self) -> usize {
        self.height as usize * 4
    }

    fn physical(&self, x: u32) -> usize {
        ((self.head as u64 + x as u64) % self.width as u64) as usize
    }

    /// Append `column_width` copies of `strip`, dropping as many old columns.
    ///
    /// `strip` holds one colour per row from the bottom of the image up;
    /// rows past its end are left transparent.
    pub fn push_column(&mut self, strip: &[Rgba], column_width: u32) {
        let repeats = column_width.clamp(1, self.width);
        let stride = self.stride();
        let height = self.height as usize;

        for _ in 0..repeats {
            let start = self.head as usize * stride;
            let column = &mut self.columns[start..start + stride];
            column.fill(0);
            for (y, color) in strip.iter().take(height).enumerate() {
                let row = height - 1 - y;
                column[row * 4..row * 4 + 4].copy_from_slice(color);
            }
            self.head = (self.head + 1) % self.width;
        }
    }

    /// Pixel at logical image coordinates (top-left origin).
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.physical(x) * self.stride() + y as usize * 4;
        Some([
            self.columns[i],
            self.columns[i + 1],
            self.columns[i + 2],
            self.columns[i + 3],
        ])
    }

    /// Row-major copy of the window, oldest column on the left.
    pub fn snapshot(&self) -> Result<Raster> {
        let mut pixels = allocate(self.width, self.height)?;
        let stride = self.stride();
        let row_bytes = self.width as usize * 4;

        for x in 0..self.width {
            let column = &self.columns[self.physical(x) * stride..][..stride];
            for (y, px) in column.chunks_exact(4).enumerate() {
                let d = y * row_bytes + x as usize * 4;
                pixels[d..d + 4].copy_from_slice(px);
            }
        }
        Ok(Raster::from_parts(self.width, self.height, pixels))
    }

    pub fn clear(&mut self) {
        self.columns.fill(0);
        self.head = 0;
    }

    pub fn is_blank(&self) -> bool {
        self.columns.iter().all(|&b| b == 0)
    }
}
