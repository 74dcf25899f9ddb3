// In-memory host for blur regions.
//
// A `Scene` is a root surface made of flat layers painted in order. It
// implements both host traits, owns the regions attached to it, and runs
// the per-frame cycle: fire pre-draw listeners, then paint.

use crate::canvas::Canvas;
use crate::error::Result;
use crate::guard::{CaptureSession, RegionDraw};
use crate::host::{DrawFlow, RegionId, RootSurface, SurfaceId, ViewTree};
use crate::region::BlurRegion;
use crate::types::{FrameBuffer, Point, Rect};
use std::cell::{Ref, RefCell};
use std::collections::{BTreeMap, BTreeSet};

pub enum Layer {
    Fill { rect: Rect, color: u32 },
    Image { rect: Rect, image: FrameBuffer },
    /// Paint slot of an attached blur region.
    Blur(RegionId),
}

/// What a frame asked the host to do next.
#[derive(Debug, Default, PartialEq)]
pub struct FrameReport {
    pub redraw_regions: Vec<RegionId>,
    pub invalidated_surfaces: Vec<SurfaceId>,
}

pub struct Scene {
    id: SurfaceId,
    origin: Point,
    width: usize,
    height: usize,
    background: Option<u32>,
    layers: Vec<Layer>,
    regions: BTreeMap<RegionId, RefCell<BlurRegion>>,
    listeners: Vec<RegionId>,
    invalidated: BTreeSet<SurfaceId>,
    next_region: u32,
}

impl Scene {
    pub fn new(id: SurfaceId, origin: Point, width: usize, height: usize) -> Self {
        Self {
            id,
            origin,
            width,
            height,
            background: None,
            layers: Vec::new(),
            regions: BTreeMap::new(),
            listeners: Vec::new(),
            invalidated: BTreeSet::new(),
            next_region: 0,
        }
    }

    pub fn set_background(&mut self, color: Option<u32>) {
        self.background = color;
    }

    pub fn push_layer(&mut self, layer: Layer) -> usize {
        self.layers.push(layer);
        self.layers.len() - 1
    }

    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    /// A fresh id for a region about to be attached here.
    pub fn next_region_id(&mut self) -> RegionId {
        self.next_region += 1;
        RegionId(self.next_region)
    }

    /// Attach a region painted by this scene at `local` (scene coordinates).
    /// Its paint slot goes on top of the current layers.
    pub fn attach_region(&mut self, mut region: BlurRegion, local: Rect) -> RegionId {
        let id = region.id();
        let root = self.id;
        region.set_bounds(local.offset(self.origin.x, self.origin.y));
        region.on_attach(self, Some(root), root);
        self.regions.insert(id, RefCell::new(region));
        self.layers.push(Layer::Blur(id));
        id
    }

    /// Attach a region that lives in another window (`own_root`, e.g. a popup)
    /// but blurs this scene. The scene does not paint it; use `paint_region`.
    pub fn attach_foreign_region(&mut self, mut region: BlurRegion, screen: Rect, own_root: SurfaceId) -> RegionId {
        let id = region.id();
        let root = self.id;
        region.set_bounds(screen);
        region.on_attach(self, Some(root), own_root);
        self.regions.insert(id, RefCell::new(region));
        id
    }

    pub fn detach_region(&mut self, id: RegionId) -> Option<BlurRegion> {
        let mut region = self.regions.remove(&id)?.into_inner();
        region.on_detach(self);
        self.layers.retain(|l| !matches!(l, Layer::Blur(r) if *r == id));
        Some(region)
    }

    pub fn region(&self, id: RegionId) -> Option<Ref<'_, BlurRegion>> {
        self.regions.get(&id).map(RefCell::borrow)
    }

    pub fn region_mut(&mut self, id: RegionId) -> Option<&mut BlurRegion> {
        self.regions.get_mut(&id).map(RefCell::get_mut)
    }

    /// Move a scene-painted region to `local` (scene coordinates).
    pub fn move_region(&mut self, id: RegionId, local: Rect) {
        let origin = self.origin;
        if let Some(region) = self.region_mut(id) {
            region.set_bounds(local.offset(origin.x, origin.y));
        }
    }

    pub fn is_listening(&self, id: RegionId) -> bool {
        self.listeners.contains(&id)
    }

    /// One draw cycle into `screen`: pre-draw hooks first, then paint.
    pub fn frame(&mut self, screen: &mut FrameBuffer) -> Result<FrameReport> {
        let this: &Scene = self;
        let mut session = CaptureSession::new();
        for id in &this.listeners {
            if let Some(cell) = this.regions.get(id) {
                cell.borrow_mut().on_pre_draw(this, &mut session)?;
            }
        }

        let mut canvas = Canvas::new(screen);
        canvas.translate(this.origin.x as f32, this.origin.y as f32);
        this.draw_background(&mut canvas);
        let _ = this.draw(&mut canvas, &mut session);

        let redraw_regions = self
            .regions
            .iter_mut()
            .filter_map(|(id, cell)| cell.get_mut().take_redraw_request().then_some(*id))
            .collect();
        let invalidated_surfaces = std::mem::take(&mut self.invalidated).into_iter().collect();
        Ok(FrameReport { redraw_regions, invalidated_surfaces })
    }

    /// Paint one region at the canvas origin outside of any capture, the way
    /// a foreign window would.
    pub fn paint_region(&self, id: RegionId, canvas: &mut Canvas<'_>) {
        if let Some(cell) = self.regions.get(&id) {
            let _ = cell.borrow().draw(canvas, &CaptureSession::new());
        }
    }
}

impl RootSurface for Scene {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn location_on_screen(&self) -> Point {
        self.origin
    }

    fn draw_background(&self, canvas: &mut Canvas<'_>) {
        if let Some(color) = self.background {
            canvas.fill_rect(Rect::sized(self.width, self.height), color);
        }
    }

    fn draw(&self, canvas: &mut Canvas<'_>, session: &mut CaptureSession) -> DrawFlow {
        for layer in &self.layers {
            match layer {
                Layer::Fill { rect, color } => canvas.fill_rect(*rect, *color),
                Layer::Image { rect, image } => {
                    canvas.draw_image(image, Rect::sized(image.width, image.height), *rect)
                }
                Layer::Blur(id) => {
                    // Decided before borrowing: the region under capture is
                    // mutably borrowed by its own pre-draw.
                    match session.check(*id) {
                        RegionDraw::Abort => return DrawFlow::Stop,
                        RegionDraw::Skip => continue,
                        RegionDraw::Draw => {}
                    }
                    let Some(cell) = self.regions.get(id) else { continue };
                    let region = cell.borrow();
                    let local = region.bounds().offset(-self.origin.x, -self.origin.y);

                    let count = canvas.save();
                    canvas.translate(local.x as f32, local.y as f32);
                    let flow = region.draw(canvas, session);
                    canvas.restore_to_count(count);
                    if flow.is_stop() {
                        return DrawFlow::Stop;
                    }
                }
            }
        }
        DrawFlow::Continue
    }
}

impl ViewTree for Scene {
    fn add_pre_draw_listener(&mut self, region: RegionId) {
        if !self.listeners.contains(&region) {
            self.listeners.push(region);
        }
    }

    fn remove_pre_draw_listener(&mut self, region: RegionId) {
        self.listeners.retain(|&r| r != region);
    }

    fn post_invalidate(&mut self, surface: SurfaceId) {
        self.invalidated.insert(surface);
    }
}
