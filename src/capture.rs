// Backdrop capture: render whatever the root surface shows underneath a
// region into that region's (downsampled) capture buffer.

use crate::canvas::Canvas;
use crate::guard::CaptureSession;
use crate::host::{RegionId, RootSurface};
use crate::types::{FrameBuffer, Rect, COLOR_MASK};
use tracing::trace;

/// Fill `target` with a downsampled snapshot of the screen rectangle
/// `bounds` as drawn by `root`. The region `region` is guarded for the
/// duration, so when the walk reaches it the walk stops there.
///
/// Returns false only when there is nothing sensible to capture (empty region).
pub fn capture(
    root: &dyn RootSurface,
    region: RegionId,
    bounds: Rect,
    overlay_color: u32,
    target: &mut FrameBuffer,
    session: &mut CaptureSession,
) -> bool {
    if bounds.is_empty() {
        return false;
    }

    // Untouched pixels must read as the (transparent) tint, not last frame.
    target.erase(overlay_color & COLOR_MASK);

    let root_pos = root.location_on_screen();
    let x = bounds.x - root_pos.x;
    let y = bounds.y - root_pos.y;
    let sx = target.width as f32 / bounds.width as f32;
    let sy = target.height as f32 / bounds.height as f32;

    let mut canvas = Canvas::new(target);
    canvas.scale(sx, sy);
    canvas.translate(-x as f32, -y as f32);

    let mut scope = session.enter(region);
    root.draw_background(&mut canvas);
    if root.draw(&mut canvas, &mut scope).is_stop() {
        trace!(?region, "capture stopped at the region itself");
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::RegionDraw;
    use crate::host::{DrawFlow, SurfaceId};
    use crate::types::Point;
    use std::cell::RefCell;

    /// Left half red, right half blue, 40x20 at screen (10, 10). Records what
    /// the guard said about region 1 while drawing.
    struct Stripes {
        seen: RefCell<Vec<(RegionDraw, usize)>>,
    }

    impl RootSurface for Stripes {
        fn id(&self) -> SurfaceId {
            SurfaceId(0)
        }

        fn location_on_screen(&self) -> Point {
            Point::new(10, 10)
        }

        fn draw(&self, canvas: &mut Canvas<'_>, session: &mut CaptureSession) -> DrawFlow {
            canvas.fill_rect(Rect::new(0, 0, 20, 20), 0xFFFF_0000);
            canvas.fill_rect(Rect::new(20, 0, 20, 20), 0xFF00_00FF);
            let decision = session.check(RegionId(1));
            self.seen.borrow_mut().push((decision, session.in_flight()));
            if decision == RegionDraw::Abort {
                return DrawFlow::Stop;
            }
            // Anything after the region must not land in the capture.
            canvas.fill_rect(Rect::new(0, 0, 40, 20), 0xFF00_FF00);
            DrawFlow::Continue
        }
    }

    #[test]
    fn captures_exactly_the_region_rectangle() {
        let root = Stripes { seen: RefCell::new(Vec::new()) };
        let mut target = FrameBuffer::new(4, 2).unwrap();
        let mut session = CaptureSession::new();

        // Screen (20,10) 20x10 -> local (10,0): red 10px then blue 10px.
        let ok = capture(&root, RegionId(1), Rect::new(20, 10, 20, 10), 0x80AB_CDEF, &mut target, &mut session);
        assert!(ok);
        assert_eq!(target.pixels, vec![0xFFFF_0000, 0xFFFF_0000, 0xFF00_00FF, 0xFF00_00FF].repeat(2));
        assert_eq!(root.seen.borrow().as_slice(), &[(RegionDraw::Abort, 1)]);
        assert_eq!(session.in_flight(), 0);
    }

    #[test]
    fn area_outside_root_reads_as_transparent_tint() {
        let root = Stripes { seen: RefCell::new(Vec::new()) };
        let mut target = FrameBuffer::new(2, 1).unwrap();
        let mut session = CaptureSession::new();

        // Right half of the region hangs past the root's right edge.
        capture(&root, RegionId(1), Rect::new(40, 10, 20, 10), 0x80AB_CDEF, &mut target, &mut session);
        assert_eq!(target.pixels, vec![0xFF00_00FF, 0x00AB_CDEF]);
    }

    #[test]
    fn other_regions_see_a_skip() {
        let root = Stripes { seen: RefCell::new(Vec::new()) };
        let mut target = FrameBuffer::new(2, 1).unwrap();
        let mut session = CaptureSession::new();
        capture(&root, RegionId(9), Rect::new(10, 10, 40, 20), 0, &mut target, &mut session);
        assert_eq!(root.seen.borrow().as_slice(), &[(RegionDraw::Skip, 1)]);
        // Nothing stopped the walk, so the final fill covers everything.
        assert!(target.pixels.iter().all(|&p| p == 0xFF00_FF00));
    }

    #[test]
    fn empty_region_is_not_captured() {
        let root = Stripes { seen: RefCell::new(Vec::new()) };
        let mut target = FrameBuffer::new(1, 1).unwrap();
        let mut session = CaptureSession::new();
        assert!(!capture(&root, RegionId(1), Rect::new(0, 0, 0, 5), 0, &mut target, &mut session));
        assert!(root.seen.borrow().is_empty());
    }
}
