// The slice of the host visual tree the compositor depends on.

use crate::canvas::Canvas;
use crate::guard::CaptureSession;
use crate::types::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u32);

/// Result of drawing a subtree. `Stop` means a region being captured was
/// reached and nothing above it may be drawn; it unwinds to the capture
/// routine that armed the guard and goes no further.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum DrawFlow {
    Continue,
    Stop,
}

impl DrawFlow {
    pub fn is_stop(self) -> bool {
        self == DrawFlow::Stop
    }
}

/// Topmost drawable surface containing a region.
pub trait RootSurface {
    fn id(&self) -> SurfaceId;

    /// Top-left corner in screen space.
    fn location_on_screen(&self) -> Point;

    /// Draw the surface's own background, if it has one.
    fn draw_background(&self, _canvas: &mut Canvas<'_>) {}

    /// Draw the full content tree in surface-local coordinates. Blur regions
    /// inside must consult `session` before drawing and return `Stop` on abort.
    fn draw(&self, canvas: &mut Canvas<'_>, session: &mut CaptureSession) -> DrawFlow;
}

/// Scheduling hooks of the host tree.
pub trait ViewTree {
    fn add_pre_draw_listener(&mut self, region: RegionId);

    fn remove_pre_draw_listener(&mut self, region: RegionId);

    /// Ask the host to repaint a whole surface on its next frame.
    fn post_invalidate(&mut self, surface: SurfaceId);
}
