use std::cell::RefCell;
use std::f32::consts::TAU;
use std::rc::Rc;

use anyhow::{Context, Result};
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use lumen_engine::coords::Vec2;
use lumen_engine::core::{App, AppControl, FrameCtx};
use lumen_engine::logging::{init_logging, LoggingConfig};
use lumen_engine::paint::Color;
use lumen_engine::render::{
    Camera, FramebufferId, PostEffect, Renderer, TextureArray, TextureArrayDesc,
    TextureArrayFormat, TextureCoordinates,
};
use lumen_engine::text::{FaceId, FontAtlas, FontAtlasBuilder};
use lumen_engine::window::{Runtime, RuntimeConfig};

const TILE_SIZE: u32 = 32;
const GRID: i32 = 24;

/// Key presses waiting for the next frame boundary.
#[derive(Debug, Copy, Clone)]
enum Action {
    ToggleMsaa,
    ToggleGrayscale,
    ToggleInvert,
}

struct Demo {
    camera: Rc<RefCell<Camera>>,
    tiles: Option<TextureArray>,
    fonts: Option<(FontAtlas, FaceId)>,
    grayscale: Option<FramebufferId>,
    invert: Option<FramebufferId>,
    pending: Vec<Action>,
}

impl Demo {
    fn new() -> Self {
        Self {
            camera: Rc::new(RefCell::new(Camera::default())),
            tiles: None,
            fonts: None,
            grayscale: None,
            invert: None,
            pending: Vec::new(),
        }
    }

    fn toggle_framebuffer(renderer: &mut Renderer<'_>, framebuffer: Option<FramebufferId>) {
        let Some(id) = framebuffer else { return; };
        let result = if renderer.framebuffer_chain().contains(&id) {
            renderer.remove_framebuffer(id)
        } else {
            renderer.add_framebuffer(id)
        };
        if let Err(e) = result {
            log::warn!("framebuffer toggle failed: {e}");
        }
    }

    fn draw_tiles(&self, renderer: &mut Renderer<'_>, t: f32) {
        renderer.set_texture_array(self.tiles.map(|tiles| tiles.id));
        let layers = self.tiles.map_or(1, |tiles| tiles.layers);

        let spacing = 48.0;
        let origin = -(GRID as f32 - 1.0) * spacing / 2.0;
        for row in 0..GRID {
            for col in 0..GRID {
                let i = (row * GRID + col) as u32;
                let phase = (row + col) as f32 * 0.15;
                let position = Vec2::new(
                    origin + col as f32 * spacing,
                    origin + row as f32 * spacing,
                );
                let size = Vec2::splat(28.0 + 8.0 * (t * 2.0 + phase).sin());
                let tint = Color::rgb(
                    0.6 + 0.4 * (t + phase).sin(),
                    0.6 + 0.4 * (t * 0.7 + phase).cos(),
                    1.0,
                );
                renderer.draw_quad_rotated(
                    position,
                    size,
                    t + phase,
                    &TextureCoordinates::layer(i % layers),
                    tint,
                );
            }
        }
    }

    fn draw_overlay(&self, renderer: &mut Renderer<'_>, t: f32, fps: f32) {
        renderer.set_texture_array(None);
        renderer.draw_quad(
            Vec2::new(0.0, 0.0),
            Vec2::new(640.0, 120.0),
            &TextureCoordinates::FULL,
            Color::rgba(0.05, 0.05, 0.1, 0.75),
        );

        let Some((atlas, face)) = &self.fonts else { return; };
        let Some(face) = atlas.face(*face) else { return; };

        renderer.draw_string("lumen", face, Vec2::new(0.0, -10.0), 2.0, Color::WHITE);
        renderer.draw_string_rotated(
            "batched quads + glyphs",
            face,
            Vec2::new(0.0, 220.0),
            0.25 * t.sin(),
            1.0,
            Color::rgb(1.0, 0.8, 0.3),
        );

        let stats = renderer.stats();
        let status = format!(
            "{fps:.0} fps  msaa {}  chain {}  [M] msaa  [G] grayscale  [I] invert",
            stats.msaa.map_or("off".to_owned(), |n| format!("{n}x")),
            stats.framebuffer_count,
        );
        renderer.draw_string(&status, face, Vec2::new(0.0, 40.0), 0.75, Color::WHITE);
    }
}

/// Layer `i` is a two-tone checkerboard with its own hue.
fn checker_layers(count: u32) -> Vec<Vec<u8>> {
    (0..count)
        .map(|layer| {
            let hue = TAU * layer as f32 / count as f32;
            let channel = |offset: f32| (255.0 * (0.5 + 0.5 * (hue + offset).cos())) as u8;
            let (r, g, b) = (channel(0.0), channel(TAU / 3.0), channel(2.0 * TAU / 3.0));
            let mut texels = Vec::with_capacity((TILE_SIZE * TILE_SIZE * 4) as usize);
            for y in 0..TILE_SIZE {
                for x in 0..TILE_SIZE {
                    let light = ((x / 8) + (y / 8)) % 2 == 0;
                    if light {
                        texels.extend_from_slice(&[r, g, b, 255]);
                    } else {
                        texels.extend_from_slice(&[r / 3, g / 3, b / 3, 255]);
                    }
                }
            }
            texels
        })
        .collect()
}

fn load_font() -> Vec<u8> {
    [
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/noto/NotoSans-Regular.ttf",
        "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    ]
    .iter()
    .find_map(|p| std::fs::read(p).ok())
    .unwrap_or_default()
}

impl App for Demo {
    fn on_init(&mut self, renderer: &mut Renderer<'_>) -> Result<()> {
        let (w, h) = renderer.surface_size();
        *self.camera.borrow_mut() = Camera::for_viewport(w as f32, h as f32);
        self.camera.borrow_mut().clear_color = Color::rgb(0.08, 0.08, 0.12);
        renderer.set_camera(&self.camera);

        let layers = checker_layers(6);
        let slices: Vec<&[u8]> = layers.iter().map(Vec::as_slice).collect();
        self.tiles = Some(
            renderer
                .create_texture_array(&TextureArrayDesc {
                    label: "demo tiles",
                    width: TILE_SIZE,
                    height: TILE_SIZE,
                    format: TextureArrayFormat::Rgba8,
                    layers: &slices,
                })
                .context("failed to upload tiles")?,
        );

        let font = load_font();
        if font.is_empty() {
            log::warn!("no system font found; text is disabled");
        } else {
            let mut builder = FontAtlasBuilder::new();
            let face = builder.add_font(&font, 32.0)?;
            let atlas = builder.build(renderer).context("failed to upload glyph atlas")?;
            self.fonts = Some((atlas, face));
        }

        self.grayscale = Some(renderer.create_framebuffer("grayscale", PostEffect::Grayscale));
        self.invert = Some(renderer.create_framebuffer("invert", PostEffect::Invert));
        Ok(())
    }

    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let WindowEvent::KeyboardInput { event, .. } = event else {
            return AppControl::Continue;
        };
        if event.state != ElementState::Pressed || event.repeat {
            return AppControl::Continue;
        }
        match event.physical_key {
            PhysicalKey::Code(KeyCode::Escape) => return AppControl::Exit,
            PhysicalKey::Code(KeyCode::KeyM) => self.pending.push(Action::ToggleMsaa),
            PhysicalKey::Code(KeyCode::KeyG) => self.pending.push(Action::ToggleGrayscale),
            PhysicalKey::Code(KeyCode::KeyI) => self.pending.push(Action::ToggleInvert),
            _ => {}
        }
        AppControl::Continue
    }

    fn on_resize(&mut self, width: u32, height: u32) {
        let mut camera = self.camera.borrow_mut();
        camera.set_aspect_ratio(width, height);
        camera.zoom = height as f32 / 2.0;
    }

    fn on_update(&mut self, renderer: &mut Renderer<'_>) {
        for action in self.pending.drain(..) {
            match action {
                Action::ToggleMsaa => {
                    let enabled = renderer.config().msaa.enabled;
                    if let Err(e) = renderer.set_msaa(!enabled) {
                        log::warn!("cannot toggle msaa: {e}");
                    }
                }
                Action::ToggleGrayscale => Self::toggle_framebuffer(renderer, self.grayscale),
                Action::ToggleInvert => Self::toggle_framebuffer(renderer, self.invert),
            }
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let t = ctx.time.elapsed;
        let fps = if ctx.time.dt > 0.0 { 1.0 / ctx.time.dt } else { 0.0 };

        ctx.layer(|renderer| self.draw_tiles(renderer, t));
        ctx.layer(|renderer| self.draw_overlay(renderer, t, fps));

        AppControl::Continue
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    Runtime::run(
        RuntimeConfig {
            title: "lumen demo".to_string(),
            ..RuntimeConfig::default()
        },
        Demo::new(),
    )
}
