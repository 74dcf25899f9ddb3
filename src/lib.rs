// Live backdrop blur.
//
// A `BlurRegion` sits in a host's visual tree. Before every frame it
// captures what the root surface draws underneath it into a downsampled
// buffer, blurs that buffer, and when the host paints it, stretches the
// blurred image over its bounds and lays a translucent tint on top.
//
// The host side is two traits, `RootSurface` and `ViewTree`. `Scene`
// is a ready-made in-memory host.

pub mod blur;
pub mod buffers;
pub mod canvas;
pub mod capture;
pub mod compositor;
pub mod config;
pub mod error;
pub mod guard;
pub mod host;
pub mod params;
pub mod region;
pub mod scene;
pub mod types;

pub use blur::{BlurEngine, BlurEngineProvider, BoxBlurEngine, BoxBlurProvider};
pub use buffers::{BufferManager, PrepareState, MAX_ENGINE_RADIUS};
pub use canvas::Canvas;
pub use config::BlurConfig;
pub use error::{Error, Result};
pub use guard::CaptureSession;
pub use host::{DrawFlow, RegionId, RootSurface, SurfaceId, ViewTree};
pub use region::BlurRegion;
pub use scene::{FrameReport, Layer, Scene};
pub use types::{FrameBuffer, Point, Rect};
