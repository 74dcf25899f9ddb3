// Final paint of a blur region: the blurred downsample stretched over the
// region, then the tint on top.

use crate::canvas::Canvas;
use crate::types::{FrameBuffer, Rect};

/// Paint into `canvas` at `bounds` (canvas-local). With no blurred output
/// only the overlay color is drawn.
pub fn draw(canvas: &mut Canvas<'_>, bounds: Rect, blurred: Option<&FrameBuffer>, overlay_color: u32) {
    if let Some(image) = blurred {
        canvas.draw_image(image, Rect::sized(image.width, image.height), bounds);
    }
    canvas.fill_rect(bounds, overlay_color);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_only_without_output() {
        let mut fb = FrameBuffer::new(2, 2).unwrap();
        fb.erase(0xFF00_0000);
        draw(&mut Canvas::new(&mut fb), Rect::sized(2, 2), None, 0xFFFF_FFFF);
        assert!(fb.pixels.iter().all(|&p| p == 0xFFFF_FFFF));
    }

    #[test]
    fn output_is_stretched_under_translucent_tint() {
        let blurred = FrameBuffer { width: 1, height: 1, pixels: vec![0xFF00_0000] };
        let mut fb = FrameBuffer::new(4, 4).unwrap();
        draw(&mut Canvas::new(&mut fb), Rect::new(1, 1, 2, 2), Some(&blurred), 0x80FF_FFFF);

        assert_eq!(fb.pixel(0, 0), Some(0));
        for (x, y) in [(1, 1), (2, 1), (1, 2), (2, 2)] {
            assert_eq!(fb.pixel(x, y), Some(0xFF80_8080), "pixel {x},{y}");
        }
    }
}
