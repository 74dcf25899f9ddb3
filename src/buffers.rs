// Owns the capture/output buffers and the blur engine for one region, and
// runs the per-frame `prepare` state machine that keeps them sized and
// configured. Buffers and the engine binding live in one bundle so they are
// always created and dropped together.

use crate::blur::{self, BlurEngine, BlurEngineProvider, EngineBinding};
use crate::error::{Error, Result};
use crate::params::ParameterStore;
use crate::types::FrameBuffer;
use tracing::{debug, warn};

/// Largest radius ever handed to the engine. Bigger requests are served by
/// downsampling harder instead.
pub const MAX_ENGINE_RADIUS: f32 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveParams {
    pub downsample: f32,
    pub radius: f32,
}

/// Apply the radius ceiling: when `radius / downsample` exceeds
/// `MAX_ENGINE_RADIUS`, the downsample grows so the engine radius lands
/// exactly on the ceiling.
pub fn effective_params(radius: f32, downsample: f32) -> EffectiveParams {
    let ratio = radius / downsample;
    if ratio > MAX_ENGINE_RADIUS {
        EffectiveParams { downsample: downsample * ratio / MAX_ENGINE_RADIUS, radius: MAX_ENGINE_RADIUS }
    } else {
        EffectiveParams { downsample, radius: ratio }
    }
}

/// Buffer size for a region: `max(1, floor(len / downsample))` per axis.
pub fn scaled_size(width: usize, height: usize, downsample: f32) -> (usize, usize) {
    let scale = |len: usize| ((len as f32 / downsample) as usize).max(1);
    (scale(width), scale(height))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareState {
    /// Radius is zero: nothing allocated, nothing to blur.
    Disabled,
    /// Buffers absent or stale.
    Unprepared,
    /// Buffers sized and engine radius current.
    Ready,
}

struct BlurSurfaces {
    capture: FrameBuffer,
    output: FrameBuffer,
    binding: EngineBinding,
}

impl BlurSurfaces {
    fn allocate(width: usize, height: usize) -> Result<Self> {
        Ok(Self {
            capture: FrameBuffer::new(width, height)?,
            binding: EngineBinding::new(width, height)?,
            output: FrameBuffer::new(width, height)?,
        })
    }

    fn dimensions(&self) -> (usize, usize) {
        self.output.dimensions()
    }
}

pub struct BufferManager {
    provider: Box<dyn BlurEngineProvider>,
    strict_engine_errors: bool,
    engine: Option<Box<dyn BlurEngine>>,
    surfaces: Option<BlurSurfaces>,
    state: PrepareState,
    generation: u64,
}

impl BufferManager {
    pub fn new(provider: Box<dyn BlurEngineProvider>) -> Self {
        Self {
            provider,
            strict_engine_errors: cfg!(debug_assertions),
            engine: None,
            surfaces: None,
            state: PrepareState::Unprepared,
            generation: 0,
        }
    }

    /// When true, a failing engine provider is reported from `prepare`;
    /// when false the region silently falls back to overlay-only.
    pub fn with_strict_engine_errors(mut self, strict: bool) -> Self {
        self.strict_engine_errors = strict;
        self
    }

    /// Get buffers and engine ready for this frame's capture.
    /// Returns Ok(true) when there is something to capture into.
    pub fn prepare(&mut self, params: &mut ParameterStore, width: usize, height: usize) -> Result<bool> {
        // Zero, negative and NaN radii all mean "no blur".
        if !(params.radius() > 0.0) {
            self.release();
            self.state = PrepareState::Disabled;
            return Ok(false);
        }

        let eff = effective_params(params.radius(), params.downsample_factor());

        if params.is_dirty() || self.engine.is_none() {
            if self.engine.is_none() {
                match self.provider.create() {
                    Ok(engine) => {
                        debug!("blur engine acquired");
                        self.engine = Some(engine);
                    }
                    Err(e) if self.strict_engine_errors => {
                        self.release_engine();
                        self.state = PrepareState::Unprepared;
                        return Err(e);
                    }
                    Err(e) => {
                        warn!("blur disabled, engine unavailable: {e}");
                        self.release_engine();
                        self.state = PrepareState::Unprepared;
                        return Ok(false);
                    }
                }
            }
            if let Some(engine) = self.engine.as_mut() {
                engine.set_radius(eff.radius);
            }
            params.clear_dirty();
        }

        let (w, h) = scaled_size(width, height, eff.downsample);
        let stale = self.surfaces.as_ref().is_none_or(|s| s.dimensions() != (w, h));
        if stale {
            self.release_surfaces();
            match BlurSurfaces::allocate(w, h) {
                Ok(surfaces) => {
                    debug!(width = w, height = h, downsample = eff.downsample, "blur buffers allocated");
                    self.surfaces = Some(surfaces);
                    self.generation += 1;
                }
                Err(e @ Error::AllocationFailure { .. }) => {
                    warn!("skipping blur this frame: {e}");
                    self.state = PrepareState::Unprepared;
                    return Ok(false);
                }
                Err(e) => return Err(e),
            }
        }

        self.state = PrepareState::Ready;
        Ok(true)
    }

    /// Blur the capture buffer into the output buffer. A no-op when any
    /// resource is missing; the output then keeps last frame's content.
    pub fn blur(&mut self) -> bool {
        let (Some(engine), Some(s)) = (self.engine.as_mut(), self.surfaces.as_mut()) else {
            return false;
        };
        blur::apply(engine.as_mut(), &mut s.binding, &s.capture, &mut s.output)
    }

    /// Drop buffers and binding (engine survives).
    pub fn release_surfaces(&mut self) {
        if self.surfaces.take().is_some() {
            debug!("blur buffers released");
        }
        if self.state == PrepareState::Ready {
            self.state = PrepareState::Unprepared;
        }
    }

    pub fn release_engine(&mut self) {
        if self.engine.take().is_some() {
            debug!("blur engine released");
        }
    }

    /// Drop everything.
    pub fn release(&mut self) {
        self.release_surfaces();
        self.release_engine();
    }

    pub fn state(&self) -> PrepareState {
        self.state
    }

    /// Bumped every time a fresh output buffer is allocated.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    pub fn engine_radius(&self) -> Option<f32> {
        self.engine.as_ref().map(|e| e.radius())
    }

    pub fn buffer_size(&self) -> Option<(usize, usize)> {
        self.surfaces.as_ref().map(BlurSurfaces::dimensions)
    }

    pub fn capture_buffer_mut(&mut self) -> Option<&mut FrameBuffer> {
        self.surfaces.as_mut().map(|s| &mut s.capture)
    }

    pub fn capture_buffer(&self) -> Option<&FrameBuffer> {
        self.surfaces.as_ref().map(|s| &s.capture)
    }

    pub fn output_buffer(&self) -> Option<&FrameBuffer> {
        self.surfaces.as_ref().map(|s| &s.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blur::BoxBlurEngine;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingProvider(Rc<Cell<usize>>);

    impl BlurEngineProvider for CountingProvider {
        fn create(&self) -> Result<Box<dyn BlurEngine>> {
            self.0.set(self.0.get() + 1);
            Ok(Box::new(BoxBlurEngine::default()))
        }
    }

    struct BrokenProvider;

    impl BlurEngineProvider for BrokenProvider {
        fn create(&self) -> Result<Box<dyn BlurEngine>> {
            Err(Error::ResourceUnavailable("no driver".into()))
        }
    }

    fn manager() -> (BufferManager, Rc<Cell<usize>>) {
        let count = Rc::new(Cell::new(0));
        (BufferManager::new(Box::new(CountingProvider(count.clone()))), count)
    }

    fn params(radius: f32, downsample: f32) -> ParameterStore {
        let mut p = ParameterStore::default();
        p.set_radius(radius);
        p.set_downsample_factor(downsample).unwrap();
        p
    }

    #[test]
    fn clamp_keeps_small_ratios() {
        assert_eq!(effective_params(10.0, 4.0), EffectiveParams { downsample: 4.0, radius: 2.5 });
        assert_eq!(effective_params(100.0, 4.0), EffectiveParams { downsample: 4.0, radius: 25.0 });
    }

    #[test]
    fn clamp_rescales_downsample_above_ceiling() {
        assert_eq!(effective_params(200.0, 4.0), EffectiveParams { downsample: 8.0, radius: 25.0 });
        for (r, d) in [(51.0, 1.0), (300.0, 2.5), (1000.0, 0.5)] {
            let eff = effective_params(r, d);
            assert_eq!(eff.radius, MAX_ENGINE_RADIUS);
            assert!((eff.downsample - d * (r / d) / MAX_ENGINE_RADIUS).abs() < 1e-4);
        }
    }

    #[test]
    fn scaled_size_never_reaches_zero() {
        assert_eq!(scaled_size(200, 100, 4.0), (50, 25));
        assert_eq!(scaled_size(3, 2, 4.0), (1, 1));
        assert_eq!(scaled_size(0, 0, 4.0), (1, 1));
        assert_eq!(scaled_size(203, 101, 4.0), (50, 25));
    }

    #[test]
    fn prepare_allocates_at_effective_size() {
        let (mut m, _) = manager();
        let mut p = params(10.0, 4.0);
        assert_eq!(m.prepare(&mut p, 200, 100), Ok(true));
        assert_eq!(m.state(), PrepareState::Ready);
        assert_eq!(m.buffer_size(), Some((50, 25)));
        assert_eq!(m.engine_radius(), Some(2.5));
        assert!(!p.is_dirty());
    }

    #[test]
    fn prepare_with_huge_radius_downsamples_harder() {
        let (mut m, _) = manager();
        let mut p = params(200.0, 4.0);
        assert_eq!(m.prepare(&mut p, 200, 100), Ok(true));
        assert_eq!(m.engine_radius(), Some(25.0));
        assert_eq!(m.buffer_size(), Some((25, 12)));
    }

    #[test]
    fn prepare_is_idempotent() {
        let (mut m, created) = manager();
        let mut p = params(10.0, 4.0);
        m.prepare(&mut p, 200, 100).unwrap();
        let generation = m.generation();
        m.prepare(&mut p, 200, 100).unwrap();
        assert_eq!(m.generation(), generation);
        assert_eq!(created.get(), 1);
    }

    #[test]
    fn resize_reallocates_but_keeps_engine() {
        let (mut m, created) = manager();
        let mut p = params(10.0, 4.0);
        m.prepare(&mut p, 200, 100).unwrap();
        let generation = m.generation();
        m.prepare(&mut p, 400, 100).unwrap();
        assert_eq!(m.generation(), generation + 1);
        assert_eq!(m.buffer_size(), Some((100, 25)));
        assert_eq!(created.get(), 1);
    }

    #[test]
    fn radius_change_reapplies_without_reallocation() {
        let (mut m, _) = manager();
        let mut p = params(10.0, 4.0);
        m.prepare(&mut p, 200, 100).unwrap();
        let generation = m.generation();
        p.set_radius(20.0);
        m.prepare(&mut p, 200, 100).unwrap();
        assert_eq!(m.engine_radius(), Some(5.0));
        assert_eq!(m.generation(), generation);
    }

    #[test]
    fn zero_radius_disables_and_releases_everything() {
        let (mut m, _) = manager();
        let mut p = params(10.0, 4.0);
        m.prepare(&mut p, 200, 100).unwrap();
        p.set_radius(0.0);
        assert_eq!(m.prepare(&mut p, 200, 100), Ok(false));
        assert_eq!(m.state(), PrepareState::Disabled);
        assert!(m.output_buffer().is_none());
        assert!(!m.has_engine());
    }

    #[test]
    fn nan_radius_disables_without_touching_engine() {
        let (mut m, created) = manager();
        let mut p = params(10.0, 4.0);
        m.prepare(&mut p, 200, 100).unwrap();
        p.set_radius(f32::NAN);
        assert_eq!(m.prepare(&mut p, 200, 100), Ok(false));
        assert_eq!(m.state(), PrepareState::Disabled);
        assert!(!m.has_engine());
        assert!(m.buffer_size().is_none());

        // Never acquired for a NaN radius either.
        let (mut fresh, fresh_created) = manager();
        assert_eq!(fresh.prepare(&mut p, 200, 100), Ok(false));
        assert!(fresh.engine_radius().is_none());
        assert_eq!(fresh_created.get(), 0);
        assert_eq!(created.get(), 1);
    }

    #[test]
    fn broken_engine_degrades_when_lenient() {
        let mut m = BufferManager::new(Box::new(BrokenProvider)).with_strict_engine_errors(false);
        let mut p = params(10.0, 4.0);
        assert_eq!(m.prepare(&mut p, 200, 100), Ok(false));
        assert!(m.output_buffer().is_none());
        assert_eq!(m.state(), PrepareState::Unprepared);
    }

    #[test]
    fn broken_engine_propagates_when_strict() {
        let mut m = BufferManager::new(Box::new(BrokenProvider)).with_strict_engine_errors(true);
        let mut p = params(10.0, 4.0);
        let err = m.prepare(&mut p, 200, 100).unwrap_err();
        assert!(matches!(err, Error::ResourceUnavailable(_)));
    }

    #[test]
    fn allocation_failure_is_recovered_locally() {
        let (mut m, _) = manager();
        let mut p = params(10.0, 1.0);
        assert_eq!(m.prepare(&mut p, usize::MAX / 2, 1 << 20), Ok(false));
        assert!(m.output_buffer().is_none());
        assert_eq!(m.state(), PrepareState::Unprepared);

        // Next frame at a sane size works again.
        assert_eq!(m.prepare(&mut p, 20, 20), Ok(true));
    }

    #[test]
    fn blur_without_buffers_is_a_no_op() {
        let (mut m, _) = manager();
        assert!(!m.blur());
    }
}
