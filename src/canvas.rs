// Software draw target used both for the offscreen capture pass and for the
// final composite. A canvas wraps a FrameBuffer plus a scale+translate
// transform stack, so the host can render a subtree into any buffer.

use crate::types::{blend_over, FrameBuffer, Rect};

/// Local -> device mapping: `device = local * scale + offset`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub sx: f32,
    pub sy: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Transform {
    pub const IDENTITY: Transform = Transform { sx: 1.0, sy: 1.0, tx: 0.0, ty: 0.0 };

    #[inline]
    pub fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.sx + self.tx, y * self.sy + self.ty)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

pub struct Canvas<'a> {
    target: &'a mut FrameBuffer,
    transform: Transform,
    saved: Vec<Transform>,
}

impl<'a> Canvas<'a> {
    pub fn new(target: &'a mut FrameBuffer) -> Self {
        Self { target, transform: Transform::IDENTITY, saved: Vec::new() }
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Push the current transform. Returns the save count before the push,
    /// suitable for `restore_to_count`.
    pub fn save(&mut self) -> usize {
        let count = self.saved.len();
        self.saved.push(self.transform);
        count
    }

    pub fn restore(&mut self) {
        if let Some(t) = self.saved.pop() {
            self.transform = t;
        }
    }

    pub fn restore_to_count(&mut self, count: usize) {
        while self.saved.len() > count {
            self.restore();
        }
    }

    /// Scale subsequent drawing (applied before the existing transform).
    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.transform.sx *= sx;
        self.transform.sy *= sy;
    }

    /// Translate subsequent drawing in local units.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.transform.tx += dx * self.transform.sx;
        self.transform.ty += dy * self.transform.sy;
    }

    /// Alpha-blend a solid color over `rect` (local coordinates).
    pub fn fill_rect(&mut self, rect: Rect, color: u32) {
        if rect.is_empty() || color >> 24 == 0 {
            return;
        }
        let Some((x0, x1, y0, y1)) = self.device_bounds(rect) else { return };

        let w = self.target.width;
        for y in y0..y1 {
            let row = &mut self.target.pixels[y * w + x0..y * w + x1];
            for px in row {
                *px = blend_over(*px, color);
            }
        }
    }

    /// Blend the `src` part of `image` into `dst` (local coordinates),
    /// scaling with nearest-neighbour sampling.
    pub fn draw_image(&mut self, image: &FrameBuffer, src: Rect, dst: Rect) {
        let src = clip_to_image(src, image);
        if src.is_empty() || dst.is_empty() {
            return;
        }
        let Some((x0, x1, y0, y1)) = self.device_bounds(dst) else { return };

        // Device-space extent of dst, used to find the sample position.
        let (dx0, dy0) = self.transform.map(dst.x as f32, dst.y as f32);
        let (dx1, dy1) = self
            .transform
            .map(dst.x as f32 + dst.width as f32, dst.y as f32 + dst.height as f32);
        let (span_x, span_y) = (dx1 - dx0, dy1 - dy0);

        let w = self.target.width;
        for y in y0..y1 {
            let v = ((y as f32 + 0.5 - dy0) / span_y).clamp(0.0, 1.0);
            let sy = src.y as usize + ((v * src.height as f32) as usize).min(src.height - 1);
            let src_row = sy * image.width;
            for x in x0..x1 {
                let u = ((x as f32 + 0.5 - dx0) / span_x).clamp(0.0, 1.0);
                let sx = src.x as usize + ((u * src.width as f32) as usize).min(src.width - 1);
                let idx = y * w + x;
                self.target.pixels[idx] = blend_over(self.target.pixels[idx], image.pixels[src_row + sx]);
            }
        }
    }

    /// Map a local rect to the device pixels whose centers it covers,
    /// clipped to the target. Returns (x0, x1, y0, y1), end-exclusive.
    fn device_bounds(&self, rect: Rect) -> Option<(usize, usize, usize, usize)> {
        let (ax, ay) = self.transform.map(rect.x as f32, rect.y as f32);
        let (bx, by) = self
            .transform
            .map(rect.x as f32 + rect.width as f32, rect.y as f32 + rect.height as f32);
        let (x0, x1) = pixel_span(ax, bx, self.target.width)?;
        let (y0, y1) = pixel_span(ay, by, self.target.height)?;
        Some((x0, x1, y0, y1))
    }
}

/// Pixels i with `lo <= i + 0.5 < hi`, clipped to `[0, limit)`.
fn pixel_span(a: f32, b: f32, limit: usize) -> Option<(usize, usize)> {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let start = (lo - 0.5).ceil().max(0.0);
    let end = (hi - 0.5).ceil().min(limit as f32);
    if end <= start {
        return None;
    }
    Some((start as usize, end as usize))
}

fn clip_to_image(src: Rect, image: &FrameBuffer) -> Rect {
    let x = src.x.max(0) as usize;
    let y = src.y.max(0) as usize;
    let right = (src.x as i64 + src.width as i64).clamp(0, image.width as i64) as usize;
    let bottom = (src.y as i64 + src.height as i64).clamp(0, image.height as i64) as usize;
    Rect::new(x as i32, y as i32, right.saturating_sub(x), bottom.saturating_sub(y))
}
