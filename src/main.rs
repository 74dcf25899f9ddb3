// What you SEE:
// • A picture (or a generated pattern) scrolling slowly, with a few bars
//   sliding across it.
// • A frosted panel in the middle that blurs whatever passes beneath it, live.
// • A smaller, darker panel overlapping it: blur panels never blur each other.
// • Up/Down: radius   Left/Right: downsample   A/Z: tint alpha
//   R: tint from the picture's average color   Space: pause   ESC: quit.

mod draw;

use anyhow::{Context, Result};
use backdrop_blur::types::{argb, COLOR_MASK};
use backdrop_blur::{BlurConfig, BlurRegion, FrameBuffer, Layer, Point, Rect, Scene, SurfaceId};
use clap::Parser;
use draw::{draw_text_5x7, Drawer};
use image::imageops::{self, FilterType};
use minifb::Key;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const SCROLL_SPEED: f32 = 40.0; // px/sec
const DOWNSAMPLE_STEPS: [f32; 6] = [1.0, 2.0, 4.0, 8.0, 12.0, 16.0];

#[derive(Parser)]
#[command(name = "backdrop-blur")]
#[command(about = "Live backdrop blur demo", long_about = None)]
struct Cli {
    /// Backdrop picture; a generated pattern is used when omitted
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// TOML file with the starting blur parameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 800)]
    width: usize,

    #[arg(long, default_value_t = 600)]
    height: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let (w, h) = (cli.width, cli.height);
    let config = match &cli.config {
        Some(path) => BlurConfig::load(path)?,
        None => BlurConfig::default(),
    };
    let backdrop = match &cli.image {
        Some(path) => load_backdrop(path, w)?,
        None => pattern(w, h)?,
    };
    let average = backdrop.average_color();

    /* --- Scene: two stacked copies of the backdrop so scrolling wraps --- */
    let mut scene = Scene::new(SurfaceId(0), Point::default(), w, h);
    scene.set_background(Some(0xFF20_2020));
    let tile_h = backdrop.height;
    let first_tile = scene.push_layer(Layer::Image { rect: Rect::sized(w, tile_h), image: backdrop.clone() });
    scene.push_layer(Layer::Image { rect: Rect::new(0, tile_h as i32, w, tile_h), image: backdrop });

    let bars = [0xFFE6_4A19, 0xFF1E_88E5, 0xFF43_A047];
    let first_bar = scene.layers_mut().len();
    for (i, &color) in bars.iter().enumerate() {
        scene.push_layer(Layer::Fill { rect: Rect::new(0, (h / 5 * (i + 1)) as i32, w / 6, 24), color });
    }

    /* --- Blur panels --- */
    let main_id = scene.next_region_id();
    let main_panel = BlurRegion::with_config(main_id, &config)?;
    scene.attach_region(main_panel, Rect::new((w / 8) as i32, (h / 4) as i32, w * 3 / 4, h / 2));

    let side_id = scene.next_region_id();
    let mut side_panel = BlurRegion::with_config(side_id, &config)?;
    side_panel.set_overlay_color(0x9020_2020);
    scene.attach_region(side_panel, Rect::new((w * 5 / 8) as i32, (h / 8) as i32, w / 4, h / 4));

    let mut drawer = Drawer::new("Backdrop Blur", w, h)?;
    let mut screen = FrameBuffer::new(w, h)?;

    let mut scroll = 0.0f32;
    let mut paused = false;
    let started = Instant::now();
    let mut last_fps_time = Instant::now();
    let mut frames_this_second = 0u32;
    let mut hud_fps_text = String::from("FPS: 0.0");
    let mut last_frame_time = Instant::now();

    info!(width = w, height = h, "demo running");

    while drawer.is_open() && !drawer.esc_pressed() {
        let now = Instant::now();
        let dt = (now - last_frame_time).as_secs_f32();
        last_frame_time = now;

        /* 1) Inputs -> region parameters */
        if let Some(panel) = scene.region_mut(main_id) {
            if drawer.key_down(Key::Up) {
                panel.set_radius(panel.radius() + 30.0 * dt);
            }
            if drawer.key_down(Key::Down) {
                panel.set_radius((panel.radius() - 30.0 * dt).max(0.0));
            }

            let step = DOWNSAMPLE_STEPS.iter().position(|&d| d >= panel.downsample_factor()).unwrap_or(2);
            let next = if drawer.key_pressed_once(Key::Right) {
                Some((step + 1).min(DOWNSAMPLE_STEPS.len() - 1))
            } else if drawer.key_pressed_once(Key::Left) {
                Some(step.saturating_sub(1))
            } else {
                None
            };
            if let Some(next) = next {
                panel.set_downsample_factor(DOWNSAMPLE_STEPS[next])?;
            }

            let color = panel.overlay_color();
            let alpha = (color >> 24) as i32;
            let alpha_step = if drawer.key_down(Key::A) { 4 } else if drawer.key_down(Key::Z) { -4 } else { 0 };
            if alpha_step != 0 {
                let alpha = (alpha + alpha_step).clamp(0, 255) as u32;
                panel.set_overlay_color((alpha << 24) | (color & COLOR_MASK));
            }
            if drawer.key_pressed_once(Key::R) {
                panel.set_overlay_color((color & !COLOR_MASK) | (average & COLOR_MASK));
            }
        }
        if drawer.key_pressed_once(Key::Space) {
            paused = !paused;
        }

        /* 2) Animate the content underneath */
        if !paused {
            scroll = (scroll + SCROLL_SPEED * dt) % tile_h.max(1) as f32;
        }
        let t = (now - started).as_secs_f32();
        for (i, layer) in scene.layers_mut().iter_mut().enumerate() {
            match layer {
                Layer::Image { rect, .. } if i == first_tile || i == first_tile + 1 => {
                    let base = if i == first_tile { 0 } else { tile_h as i32 };
                    rect.y = base - scroll as i32;
                }
                Layer::Fill { rect, .. } if i >= first_bar && i < first_bar + bars.len() => {
                    let phase = t * 0.6 + (i - first_bar) as f32 * 1.7;
                    rect.x = ((phase.sin() * 0.5 + 0.5) * (w - rect.width) as f32) as i32;
                }
                _ => {}
            }
        }

        /* 3) Frame: capture + blur under every panel, then paint */
        screen.erase(0xFF00_0000);
        let report = scene.frame(&mut screen)?;
        if !report.redraw_regions.is_empty() {
            debug!(regions = ?report.redraw_regions, "panels asked for a redraw");
        }

        /* 4) HUD */
        if let Some(panel) = scene.region(main_id) {
            let hud = format!(
                "RADIUS: {:.1} | DOWN: {:.1} | ALPHA: {} | {}{}",
                panel.radius(),
                panel.downsample_factor(),
                panel.overlay_color() >> 24,
                hud_fps_text,
                if paused { " | PAUSED" } else { "" },
            );
            draw_text_5x7(&mut screen, 8, 8, &hud, 0xFFFF_FFFF);
        }

        drawer.present(&screen)?;

        /* 5) FPS counter */
        frames_this_second += 1;
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            let secs = now.duration_since(last_fps_time).as_secs_f32();
            let fps = frames_this_second as f32 / secs;
            debug!("FPS: {:.1}", fps);
            hud_fps_text = format!("FPS: {:.1}", fps);
            frames_this_second = 0;
            last_fps_time = now;
        }
    }

    Ok(())
}

/// Load a picture and scale it to the window width, keeping its aspect.
fn load_backdrop(path: &Path, width: usize) -> Result<FrameBuffer> {
    let img = image::open(path)
        .with_context(|| format!("open backdrop {}", path.display()))?
        .to_rgba8();
    let (iw, ih) = img.dimensions();
    if iw == 0 || ih == 0 {
        warn!("backdrop {} is empty, using pattern", path.display());
        return Ok(pattern(width, width)?);
    }
    let height = ((ih as f32 * width as f32 / iw as f32).round() as u32).max(1);
    let scaled = imageops::resize(&img, width as u32, height, FilterType::Triangle);
    Ok(FrameBuffer::from_rgba_image(&scaled))
}

/// Diagonal color bands with a checker overlay: lots of edges to blur.
fn pattern(width: usize, height: usize) -> backdrop_blur::Result<FrameBuffer> {
    let mut fb = FrameBuffer::new(width, height)?;
    for y in 0..height {
        for x in 0..width {
            let band = ((x + y) / 48) % 4;
            let (r, g, b) = match band {
                0 => (0xF4, 0x43, 0x36),
                1 => (0xFF, 0xC1, 0x07),
                2 => (0x00, 0x96, 0x88),
                _ => (0x3F, 0x51, 0xB5),
            };
            let dark = ((x / 16) + (y / 16)) % 2 == 0;
            let shade = |c: u8| if dark { c / 2 + c / 4 } else { c };
            fb.pixels[y * width + x] = argb(0xFF, shade(r), shade(g), shade(b));
        }
    }
    Ok(fb)
}
