// Core pixel and geometry types shared by every stage of the blur pipeline.

use crate::error::{Error, Result};
use image::RgbaImage;

/// Drops the alpha byte of a packed 0xAARRGGBB color.
pub const COLOR_MASK: u32 = 0x00FF_FFFF;

/// Pack four channels into 0xAARRGGBB.
#[inline]
pub fn argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Split 0xAARRGGBB into [a, r, g, b].
#[inline]
pub fn channels(c: u32) -> [u32; 4] {
    [(c >> 24) & 0xFF, (c >> 16) & 0xFF, (c >> 8) & 0xFF, c & 0xFF]
}

/// Standard "source over" blend of two non-premultiplied ARGB colors.
pub fn blend_over(dst: u32, src: u32) -> u32 {
    let [sa, sr, sg, sb] = channels(src);
    if sa == 255 {
        return src;
    }
    if sa == 0 {
        return dst;
    }
    let [da, dr, dg, db] = channels(dst);

    // Everything below is scaled by 255 * 255 to stay in integers.
    let dst_weight = da * (255 - sa);
    let out_a = sa * 255 + dst_weight;
    let mix = |s: u32, d: u32| ((s * sa * 255 + d * dst_weight + out_a / 2) / out_a).min(255);

    ((out_a + 127) / 255) << 24 | mix(sr, dr) << 16 | mix(sg, dg) << 8 | mix(sb, db)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in integer pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: usize, height: usize) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle at the origin with the given size.
    pub const fn sized(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// ARGB pixel buffer. Each entry is 0xAARRGGBB, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl FrameBuffer {
    /// Allocate a transparent buffer. Fails instead of aborting when the
    /// allocator cannot satisfy the request.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        let fail = || Error::AllocationFailure { width, height };
        let len = width.checked_mul(height).ok_or_else(fail)?;

        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len).map_err(|_| fail())?;
        pixels.resize(len, 0);

        Ok(Self { width, height, pixels })
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Fill every pixel with one color.
    pub fn erase(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }

    /// Copy pixels from a buffer of identical size. Returns false on mismatch.
    pub fn copy_from(&mut self, other: &FrameBuffer) -> bool {
        if self.dimensions() != other.dimensions() {
            return false;
        }
        self.pixels.copy_from_slice(&other.pixels);
        true
    }

    /// Pack an RGBA image into ARGB pixels.
    pub fn from_rgba_image(img: &RgbaImage) -> Self {
        let (w, h) = img.dimensions();
        let pixels = img
            .pixels()
            .map(|p| argb(p[3], p[0], p[1], p[2]))
            .collect();
        Self { width: w as usize, height: h as usize, pixels }
    }

    /// Mean color over all pixels, fully opaque. Black for an empty buffer.
    pub fn average_color(&self) -> u32 {
        if self.pixels.is_empty() {
            return 0xFF00_0000;
        }
        let mut sums = [0u64; 3];
        for &p in &self.pixels {
            let [_, r, g, b] = channels(p);
            sums[0] += r as u64;
            sums[1] += g as u64;
            sums[2] += b as u64;
        }
        let n = self.pixels.len() as u64;
        argb(255, (sums[0] / n) as u8, (sums[1] / n) as u8, (sums[2] / n) as u8)
    }
}
