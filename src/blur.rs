// Blur engine adapter.
// The kernel itself is opaque to the rest of the pipeline: anything that can
// blur one ARGB buffer into another at a given radius plugs in through
// `BlurEngine`, and `BlurEngineProvider` is how the buffer manager acquires one.
// `BoxBlurEngine` is the built-in CPU kernel.

use crate::error::{Error, Result};
use crate::types::{channels, FrameBuffer};

/// An opaque blur capability: `blur(image, radius) -> image`.
pub trait BlurEngine {
    fn set_radius(&mut self, radius: f32);

    fn radius(&self) -> f32;

    /// Blur `input` into `output`. Both buffers have the same size.
    fn execute(&mut self, input: &FrameBuffer, output: &mut FrameBuffer) -> Result<()>;
}

/// Creates blur engines. Creation may fail for platform reasons, reported
/// as `Error::ResourceUnavailable`.
pub trait BlurEngineProvider {
    fn create(&self) -> Result<Box<dyn BlurEngine>>;
}

/// Engine-side input/output staging, sized to one capture/output pair.
/// Must be rebuilt whenever the buffers change size.
#[derive(Debug)]
pub struct EngineBinding {
    input: FrameBuffer,
    output: FrameBuffer,
}

impl EngineBinding {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        Ok(Self {
            input: FrameBuffer::new(width, height)?,
            output: FrameBuffer::new(width, height)?,
        })
    }
}

/// Copy `capture` into the engine, run the kernel, copy the result into
/// `output`. Returns false (leaving `output` untouched) when the sizes do not
/// line up or the kernel fails; the previous frame then stays on screen.
pub fn apply(
    engine: &mut dyn BlurEngine,
    binding: &mut EngineBinding,
    capture: &FrameBuffer,
    output: &mut FrameBuffer,
) -> bool {
    if !binding.input.copy_from(capture) {
        return false;
    }
    if let Err(e) = engine.execute(&binding.input, &mut binding.output) {
        tracing::warn!("blur kernel failed, keeping previous output: {e}");
        return false;
    }
    output.copy_from(&binding.output)
}

/* ---------------------------- built-in CPU kernel ---------------------------- */

pub const DEFAULT_BOX_PASSES: u32 = 2;

/// Separable box blur over all four channels, repeated `passes` times.
/// Two or three passes approximate a Gaussian.
pub struct BoxBlurEngine {
    radius: f32,
    passes: u32,
    scratch: FrameBuffer, // horizontal pass result, reused between frames
}

impl BoxBlurEngine {
    pub fn new(passes: u32) -> Self {
        Self {
            radius: 0.0,
            passes: passes.max(1),
            scratch: FrameBuffer { width: 0, height: 0, pixels: Vec::new() },
        }
    }

    /// Per-pass box radius so that the passes together spread about `radius`.
    pub fn box_radius(&self) -> usize {
        ((self.radius / (self.passes as f32).sqrt()).round() as usize).max(1)
    }
}

impl Default for BoxBlurEngine {
    fn default() -> Self {
        Self::new(DEFAULT_BOX_PASSES)
    }
}

impl BlurEngine for BoxBlurEngine {
    fn set_radius(&mut self, radius: f32) {
        self.radius = radius.max(0.0);
    }

    fn radius(&self) -> f32 {
        self.radius
    }

    fn execute(&mut self, input: &FrameBuffer, output: &mut FrameBuffer) -> Result<()> {
        if input.dimensions() != output.dimensions() {
            return Err(Error::InvalidArgument("box blur: size mismatch input/output".into()));
        }
        let (w, h) = input.dimensions();
        if w == 0 || h == 0 {
            return Ok(());
        }
        if self.scratch.dimensions() != (w, h) {
            self.scratch = FrameBuffer::new(w, h)?;
        }
        let r = self.box_radius();

        for pass in 0..self.passes {
            let src = if pass == 0 { input } else { &*output };
            // Horizontal: rows of src into scratch.
            for y in 0..h {
                box_line(&src.pixels, &mut self.scratch.pixels, y * w, 1, w, r);
            }
            // Vertical: columns of scratch into output.
            for x in 0..w {
                box_line(&self.scratch.pixels, &mut output.pixels, x, w, h, r);
            }
        }
        Ok(())
    }
}

/// Sliding-window average along one line of `len` pixels starting at
/// `start`, `step` apart. Edge pixels are extended so borders don't darken.
fn box_line(src: &[u32], dst: &mut [u32], start: usize, step: usize, len: usize, r: usize) {
    let at = |i: usize| src[start + i.min(len - 1) * step];
    let win = (2 * r + 1) as u32;

    let mut sums = channels(at(0)).map(|c| c * (r as u32 + 1));
    for i in 1..=r {
        let p = channels(at(i));
        for c in 0..4 {
            sums[c] += p[c];
        }
    }

    for i in 0..len {
        let [a, rr, g, b] = sums.map(|s| (s + win / 2) / win);
        dst[start + i * step] = (a << 24) | (rr << 16) | (g << 8) | b;

        let leaving = channels(at(i.saturating_sub(r)));
        let entering = channels(at(i + r + 1));
        for c in 0..4 {
            sums[c] = sums[c] + entering[c] - leaving[c];
        }
    }
}

/// Hands out `BoxBlurEngine`s. Never fails.
#[derive(Debug, Clone, Copy)]
pub struct BoxBlurProvider {
    pub passes: u32,
}

impl Default for BoxBlurProvider {
    fn default() -> Self {
        Self { passes: DEFAULT_BOX_PASSES }
    }
}

impl BlurEngineProvider for BoxBlurProvider {
    fn create(&self) -> Result<Box<dyn BlurEngine>> {
        Ok(Box::new(BoxBlurEngine::new(self.passes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: usize, h: usize, color: u32) -> FrameBuffer {
        FrameBuffer { width: w, height: h, pixels: vec![color; w * h] }
    }

    #[test]
    fn uniform_image_is_unchanged() {
        let input = solid(7, 5, 0xFF40_8020);
        let mut output = solid(7, 5, 0);
        let mut engine = BoxBlurEngine::default();
        engine.set_radius(3.0);
        engine.execute(&input, &mut output).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn single_bright_pixel_spreads_to_neighbours() {
        let mut input = solid(9, 9, 0xFF00_0000);
        input.pixels[4 * 9 + 4] = 0xFFFF_FFFF;
        let mut output = solid(9, 9, 0);
        let mut engine = BoxBlurEngine::new(1);
        engine.set_radius(1.0);
        engine.execute(&input, &mut output).unwrap();

        let center = channels(output.pixel(4, 4).unwrap())[1];
        let neighbour = channels(output.pixel(5, 4).unwrap())[1];
        let far = channels(output.pixel(0, 0).unwrap())[1];
        assert!(center > 0 && center < 255);
        assert_eq!(neighbour, center);
        assert_eq!(far, 0);
    }

    #[test]
    fn alpha_channel_is_blurred_too() {
        let mut input = solid(3, 1, 0x00FF_FFFF);
        input.pixels[1] = 0xFFFF_FFFF;
        let mut output = solid(3, 1, 0);
        let mut engine = BoxBlurEngine::new(1);
        engine.set_radius(1.0);
        engine.execute(&input, &mut output).unwrap();
        assert_eq!(channels(output.pixels[1])[0], 85);
    }

    #[test]
    fn box_radius_never_drops_to_zero() {
        let mut engine = BoxBlurEngine::new(2);
        engine.set_radius(0.2);
        assert_eq!(engine.box_radius(), 1);
        engine.set_radius(25.0);
        assert_eq!(engine.box_radius(), 18);
    }

    #[test]
    fn apply_keeps_previous_output_on_size_mismatch() {
        let mut engine = BoxBlurEngine::default();
        let mut binding = EngineBinding::new(4, 4).unwrap();
        let capture = solid(2, 2, 0xFFFF_FFFF);
        let mut output = solid(2, 2, 0xFF12_3456);
        assert!(!apply(&mut engine, &mut binding, &capture, &mut output));
        assert!(output.pixels.iter().all(|&p| p == 0xFF12_3456));
    }

    #[test]
    fn apply_writes_blurred_capture_into_output() {
        let mut engine = BoxBlurEngine::default();
        engine.set_radius(2.0);
        let mut binding = EngineBinding::new(3, 3).unwrap();
        let capture = solid(3, 3, 0xFF00_FF00);
        let mut output = solid(3, 3, 0);
        assert!(apply(&mut engine, &mut binding, &capture, &mut output));
        assert_eq!(output, capture);
    }
}
