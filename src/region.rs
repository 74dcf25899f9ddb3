// A live blur region.
//
// `BlurRegion` is the node a host places in its visual tree. It owns its
// parameters and buffers, hooks into the host's pre-draw notification to
// re-capture and re-blur its backdrop every frame, and paints the result
// when the host draws it.

use crate::blur::{BlurEngineProvider, BoxBlurProvider};
use crate::buffers::BufferManager;
use crate::canvas::Canvas;
use crate::capture;
use crate::compositor;
use crate::config::BlurConfig;
use crate::error::Result;
use crate::guard::{CaptureSession, RegionDraw};
use crate::host::{DrawFlow, RegionId, RootSurface, SurfaceId, ViewTree};
use crate::params::ParameterStore;
use crate::types::Rect;
use tracing::debug;

pub struct BlurRegion {
    id: RegionId,
    params: ParameterStore,
    buffers: BufferManager,
    /// Screen-space bounds.
    bounds: Rect,
    visible: bool,
    attached: bool,
    root: Option<SurfaceId>,
    distinct_root: bool,
    redraw_requested: bool,
}

impl BlurRegion {
    /// Region with default parameters and the built-in CPU blur.
    pub fn new(id: RegionId) -> Self {
        Self::from_parts(id, ParameterStore::default(), BufferManager::new(Box::new(BoxBlurProvider::default())))
    }

    pub fn with_config(id: RegionId, config: &BlurConfig) -> Result<Self> {
        Self::with_provider(id, config, Box::new(BoxBlurProvider::default()))
    }

    pub fn with_provider(id: RegionId, config: &BlurConfig, provider: Box<dyn BlurEngineProvider>) -> Result<Self> {
        let mut params = ParameterStore::default();
        params.set_downsample_factor(config.downsample_factor)?;
        params.set_radius(config.blur_radius);
        params.set_overlay_color(config.overlay_color);
        let buffers = BufferManager::new(provider).with_strict_engine_errors(config.strict_engine_errors);
        Ok(Self::from_parts(id, params, buffers))
    }

    fn from_parts(id: RegionId, params: ParameterStore, buffers: BufferManager) -> Self {
        Self {
            id,
            params,
            buffers,
            bounds: Rect::default(),
            visible: true,
            attached: false,
            root: None,
            distinct_root: false,
            redraw_requested: false,
        }
    }

    pub fn id(&self) -> RegionId {
        self.id
    }

    /* ------------------------------ parameters ------------------------------ */

    pub fn set_radius(&mut self, radius: f32) {
        if self.params.set_radius(radius) {
            self.invalidate();
        }
    }

    /// Fails with `InvalidArgument` for factors <= 0; nothing changes then.
    pub fn set_downsample_factor(&mut self, factor: f32) -> Result<()> {
        if self.params.set_downsample_factor(factor)? {
            self.buffers.release_surfaces();
            self.invalidate();
        }
        Ok(())
    }

    pub fn set_overlay_color(&mut self, color: u32) {
        if self.params.set_overlay_color(color) {
            self.invalidate();
        }
    }

    pub fn radius(&self) -> f32 {
        self.params.radius()
    }

    pub fn downsample_factor(&self) -> f32 {
        self.params.downsample_factor()
    }

    pub fn overlay_color(&self) -> u32 {
        self.params.overlay_color()
    }

    /* ------------------------------- geometry ------------------------------- */

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /* ------------------------------- lifecycle ------------------------------ */

    /// `root` is the surface to capture (None when the host has none to
    /// offer), `own_root` the root of the tree this region sits in.
    pub fn on_attach(&mut self, tree: &mut dyn ViewTree, root: Option<SurfaceId>, own_root: SurfaceId) {
        self.attached = true;
        self.root = root;
        self.distinct_root = false;

        let Some(root) = root else { return };
        tree.add_pre_draw_listener(self.id);
        // A region in another window (e.g. a popup) is not repainted when the
        // root repaints, so it has to push invalidations itself.
        self.distinct_root = root != own_root;
        if self.distinct_root {
            tree.post_invalidate(root);
        }
        debug!(region = ?self.id, ?root, distinct = self.distinct_root, "blur region attached");
    }

    pub fn on_detach(&mut self, tree: &mut dyn ViewTree) {
        if self.root.take().is_some() {
            tree.remove_pre_draw_listener(self.id);
        }
        self.buffers.release();
        self.attached = false;
        self.distinct_root = false;
        debug!(region = ?self.id, "blur region detached");
    }

    /// Pre-draw hook: prepare, capture, blur. Always lets the frame proceed
    /// (`Ok(true)`); an error only surfaces when strict engine errors are on.
    pub fn on_pre_draw(&mut self, root: &dyn RootSurface, session: &mut CaptureSession) -> Result<bool> {
        if !self.attached || !self.visible || self.root.is_none() {
            return Ok(true);
        }
        if self.root != Some(root.id()) {
            debug!(region = ?self.id, expected = ?self.root, got = ?root.id(), "pre-draw from a foreign root ignored");
            return Ok(true);
        }

        let generation = self.buffers.generation();
        if !self.buffers.prepare(&mut self.params, self.bounds.width, self.bounds.height)? {
            return Ok(true);
        }
        let fresh_output = self.buffers.generation() != generation;

        let overlay = self.params.overlay_color();
        if let Some(target) = self.buffers.capture_buffer_mut() {
            capture::capture(root, self.id, self.bounds, overlay, target, session);
        }
        self.buffers.blur();

        if fresh_output || self.distinct_root {
            self.invalidate();
        }
        Ok(true)
    }

    /// Draw entry point, called by the host with the canvas translated to
    /// this region's top-left corner.
    pub fn draw(&self, canvas: &mut Canvas<'_>, session: &CaptureSession) -> DrawFlow {
        if !self.visible {
            return DrawFlow::Continue;
        }
        match session.check(self.id) {
            // Don't draw anything above me into my own backdrop.
            RegionDraw::Abort => DrawFlow::Stop,
            // No blur-on-blur.
            RegionDraw::Skip => DrawFlow::Continue,
            RegionDraw::Draw => {
                let local = Rect::sized(self.bounds.width, self.bounds.height);
                compositor::draw(canvas, local, self.buffers.output_buffer(), self.params.overlay_color());
                DrawFlow::Continue
            }
        }
    }

    /* -------------------------------- redraw -------------------------------- */

    pub fn invalidate(&mut self) {
        self.redraw_requested = true;
    }

    /// Returns and clears the pending redraw request.
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn has_distinct_root(&self) -> bool {
        self.distinct_root
    }

    pub fn buffers(&self) -> &BufferManager {
        &self.buffers
    }
}
