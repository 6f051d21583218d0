//! Frame context: the per-frame and per-layer lifecycle around both batches
//! and the framebuffer chain.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::coords::{Rotation, Vec2};
use crate::paint::Color;

use super::backend::{BufferId, FramebufferId, GraphicsBackend, PostEffect, TextureArrayId};
use super::text::{glyph_corners, pen_start};
use super::vertex::CameraUniform;
use super::{
    validate_sample_count, Camera, FrameCompositor, GlyphSource, QuadBatch, RenderError,
    RendererConfig, TextBatch, TextureArray, TextureArrayDesc, TextureArrayFormat,
    TextureCoordinates,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Phase {
    /// Between frames.
    Idle,
    /// Frame begun, no layer open.
    Frame,
    /// Layer open: both sinks mapped.
    Layer,
}

/// Read-only snapshot for debug overlays and tooling.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RendererStats {
    /// Quads pending in the open layer.
    pub quad_count: u32,
    /// Glyph quads pending in the open layer.
    pub glyph_count: u32,
    /// Batch draws issued since `begin_frame`.
    pub draw_calls: u32,
    /// Flushes forced by a full sink since `begin_frame`.
    pub overflow_flushes: u32,
    /// Full-screen passes issued by the last `end_frame`.
    pub fullscreen_passes: u32,
    pub framebuffer_count: usize,
    /// Sample count while MSAA is on.
    pub msaa: Option<u32>,
    pub max_quads: u32,
    pub max_glyphs: u32,
}

#[derive(Debug, Copy, Clone, Default)]
struct FrameCounters {
    draw_calls: u32,
    overflow_flushes: u32,
    fullscreen_passes: u32,
}

/// Batched 2D renderer bound to one graphics backend.
///
/// Usage per frame:
///
/// ```text
/// begin_frame
///     begin_layer  draw_quad* draw_string*  end_layer
///     ...
/// end_frame
/// ```
///
/// Within a layer every quad is drawn before every glyph, whatever the call
/// order. Draws issued outside a layer are logged and dropped.
pub struct Renderer<'w> {
    backend: Box<dyn GraphicsBackend + 'w>,
    config: RendererConfig,

    quad_batch: QuadBatch,
    text_batch: TextBatch,
    compositor: FrameCompositor,
    framebuffers: Vec<FramebufferId>,

    camera: Option<Weak<RefCell<Camera>>>,
    fallback_camera: Camera,
    camera_lost_logged: bool,
    camera_buffer: BufferId,

    white: TextureArray,
    quad_textures: TextureArrayId,
    texture_layers: HashMap<TextureArrayId, u32>,

    phase: Phase,
    counters: FrameCounters,
}

impl<'w> Renderer<'w> {
    /// Allocates both batches, the camera uniform and the default white
    /// texture on `backend`.
    ///
    /// Panics if `config` fails [`RendererConfig::validate`].
    pub fn new(
        backend: impl GraphicsBackend + 'w,
        mut config: RendererConfig,
    ) -> Result<Self, RenderError> {
        config.validate();
        let mut backend: Box<dyn GraphicsBackend + 'w> = Box::new(backend);

        let camera_buffer = backend.create_uniform_buffer("lumen camera", CameraUniform::SIZE);
        let quad_batch = QuadBatch::new(backend.as_mut(), config.max_quads);
        let text_batch = TextBatch::new(backend.as_mut(), config.max_glyphs);

        let white_texel: &[u8] = &[255, 255, 255, 255];
        let white_desc = TextureArrayDesc {
            label: "lumen white",
            width: 1,
            height: 1,
            format: TextureArrayFormat::Rgba8,
            layers: &[white_texel],
        };
        let white_id = backend.create_texture_array(&white_desc)?;
        let white = TextureArray { id: white_id, width: 1, height: 1, layers: 1 };

        backend.set_blend_mode(config.blend);
        if config.msaa.enabled {
            if let Err(e) = backend.configure_multisample(Some(config.msaa.sample_count)) {
                log::error!("{e}; continuing without msaa");
                config.msaa.enabled = false;
            }
        }

        let (width, height) = backend.surface_size();
        let mut fallback_camera = Camera::default();
        fallback_camera.set_aspect_ratio(width, height);

        log::info!(
            "renderer ready: {} quads, {} glyphs, msaa {}",
            config.max_quads,
            config.max_glyphs,
            if config.msaa.enabled {
                format!("{}x", config.msaa.sample_count)
            } else {
                "off".to_owned()
            }
        );

        Ok(Self {
            backend,
            config,
            quad_batch,
            text_batch,
            compositor: FrameCompositor::new(),
            framebuffers: Vec::new(),
            camera: None,
            fallback_camera,
            camera_lost_logged: false,
            camera_buffer,
            white,
            quad_textures: white_id,
            texture_layers: HashMap::from([(white_id, 1)]),
            phase: Phase::Idle,
            counters: FrameCounters::default(),
        })
    }

    // ── frame lifecycle ───────────────────────────────────────────────────

    /// Acquires the surface, uploads the camera and binds the frame's first
    /// render target.
    ///
    /// Returns [`RenderError::FrameSkipped`] when the surface has no frame to
    /// give (the caller should simply try again next redraw).
    pub fn begin_frame(&mut self) -> Result<(), RenderError> {
        if self.phase != Phase::Idle {
            log::error!("begin_frame called while a frame is open; ignored");
            return Ok(());
        }

        self.backend.acquire_frame()?;

        let camera = self.active_camera();
        self.backend
            .write_buffer(self.camera_buffer, bytemuck::bytes_of(&camera.uniform()));
        self.backend.set_clear_color(camera.clear_color);

        let target = self.compositor.primary_target(self.config.msaa.enabled);
        self.backend.bind_target(target);

        self.counters = FrameCounters::default();
        self.phase = Phase::Frame;
        Ok(())
    }

    /// Maps both vertex sinks.
    pub fn begin_layer(&mut self) {
        match self.phase {
            Phase::Frame => {
                self.quad_batch.begin();
                self.text_batch.begin();
                self.phase = Phase::Layer;
            }
            Phase::Layer => log::error!("begin_layer called while a layer is open; ignored"),
            Phase::Idle => log::error!("begin_layer called outside a frame; ignored"),
        }
    }

    /// Unmaps both sinks and issues one draw per non-empty batch, quads
    /// first.
    pub fn end_layer(&mut self) {
        if self.phase != Phase::Layer {
            log::error!("end_layer called without an open layer; ignored");
            return;
        }
        self.flush_quads();
        self.flush_text();
        self.phase = Phase::Frame;
    }

    /// Closes any open layer, composites the framebuffer chain and presents.
    pub fn end_frame(&mut self) {
        match self.phase {
            Phase::Idle => {
                log::error!("end_frame called without begin_frame; ignored");
                return;
            }
            Phase::Layer => {
                log::warn!("end_frame closed a layer left open");
                self.end_layer();
            }
            Phase::Frame => {}
        }

        self.counters.fullscreen_passes = self
            .compositor
            .composite(self.backend.as_mut(), self.config.msaa.enabled);
        self.backend.present();
        self.phase = Phase::Idle;
    }

    // ── quads ─────────────────────────────────────────────────────────────

    /// Axis-aligned quad centred on `position`.
    pub fn draw_quad(
        &mut self,
        position: Vec2,
        size: Vec2,
        coords: &TextureCoordinates,
        tint: Color,
    ) {
        self.draw_quad_rotated(position, size, 0.0, coords, tint);
    }

    /// Quad centred on `position`, rotated counter-clockwise by `angle`
    /// radians about its centre.
    pub fn draw_quad_rotated(
        &mut self,
        position: Vec2,
        size: Vec2,
        angle: f32,
        coords: &TextureCoordinates,
        tint: Color,
    ) {
        debug_assert!(
            size.x >= 0.0 && size.y >= 0.0,
            "draw_quad: negative size {size:?}"
        );
        if let Some(&layers) = self.texture_layers.get(&self.quad_textures) {
            debug_assert!(
                coords.slice < layers,
                "draw_quad: slice {} out of range for a {layers}-layer texture array",
                coords.slice
            );
        }

        if !self.quad_batch.is_mapped() {
            log::error!("draw_quad outside begin_layer/end_layer; dropped");
            return;
        }

        if self.quad_batch.is_full() {
            log::warn!(
                "quad batch full ({} quads); flushing mid-layer",
                self.quad_batch.capacity()
            );
            self.counters.overflow_flushes += 1;
            self.flush_quads();
            self.quad_batch.begin();
        }

        if let Err(e) = self.quad_batch.push(position, size, angle, coords, tint) {
            log::error!("draw_quad: {e}");
        }
    }

    /// Selects the texture array quads sample from; `None` restores the
    /// built-in white texture. Pending quads are flushed first if the array
    /// changes mid-layer.
    pub fn set_texture_array(&mut self, textures: Option<TextureArrayId>) {
        let textures = textures.unwrap_or(self.white.id);
        if textures == self.quad_textures {
            return;
        }
        if self.quad_batch.is_mapped() && self.quad_batch.quad_count() > 0 {
            self.flush_quads();
            self.quad_batch.begin();
        }
        self.quad_textures = textures;
    }

    // ── text ──────────────────────────────────────────────────────────────

    /// `text` centred on `position` along the baseline.
    pub fn draw_string(
        &mut self,
        text: &str,
        font: &dyn GlyphSource,
        position: Vec2,
        scale: f32,
        tint: Color,
    ) {
        self.draw_string_rotated(text, font, position, 0.0, scale, tint);
    }

    /// `text` centred on `position`, its baseline rotated counter-clockwise
    /// by `angle` radians. Characters `font` lacks are skipped.
    pub fn draw_string_rotated(
        &mut self,
        text: &str,
        font: &dyn GlyphSource,
        position: Vec2,
        angle: f32,
        scale: f32,
        tint: Color,
    ) {
        if !self.text_batch.is_mapped() {
            log::error!("draw_string outside begin_layer/end_layer; dropped");
            return;
        }

        let textures = font.texture_array();
        if self.text_batch.textures() != Some(textures) {
            if self.text_batch.quad_count() > 0 {
                self.flush_text();
                self.text_batch.begin();
            }
            self.text_batch.set_textures(textures);
        }

        let rotation = Rotation::from_angle(angle);
        let mut pen = pen_start(text, font, position, rotation, scale);

        for ch in text.chars() {
            let Some(glyph) = font.glyph(ch) else {
                log::trace!("draw_string: no glyph for {ch:?}");
                continue;
            };

            if self.text_batch.is_full() {
                log::warn!(
                    "text batch full ({} glyphs); flushing mid-layer",
                    self.text_batch.capacity()
                );
                self.counters.overflow_flushes += 1;
                self.flush_text();
                self.text_batch.begin();
            }

            let corners = glyph_corners(pen, glyph, rotation, scale);
            if let Err(e) = self.text_batch.push(corners, &glyph.coords, tint) {
                log::error!("draw_string: {e}");
            }
            pen += rotation.axis() * (glyph.advance * scale);
        }
    }

    // ── framebuffers ──────────────────────────────────────────────────────

    /// Creates a surface-sized offscreen target sampled through `effect`.
    /// It is not part of the chain until [`add_framebuffer`](Self::add_framebuffer).
    pub fn create_framebuffer(&mut self, label: &str, effect: PostEffect) -> FramebufferId {
        let id = self.backend.create_framebuffer(label, &effect);
        self.framebuffers.push(id);
        log::debug!("framebuffer {id:?} '{label}' created ({effect:?})");
        id
    }

    /// Removes `framebuffer` from the chain if present, then releases it.
    pub fn destroy_framebuffer(&mut self, framebuffer: FramebufferId) -> Result<(), RenderError> {
        if !self.framebuffers.contains(&framebuffer) {
            log::error!("destroy_framebuffer: {framebuffer:?} does not exist");
            return Err(RenderError::UnknownFramebuffer(framebuffer));
        }
        if self.compositor.contains(framebuffer) {
            self.compositor.remove(framebuffer)?;
        }
        self.backend.destroy_framebuffer(framebuffer)?;
        self.framebuffers.retain(|&f| f != framebuffer);
        Ok(())
    }

    /// Appends `framebuffer` to the chain. Takes effect from the next frame.
    pub fn add_framebuffer(&mut self, framebuffer: FramebufferId) -> Result<(), RenderError> {
        if !self.framebuffers.contains(&framebuffer) {
            log::error!("add_framebuffer: {framebuffer:?} does not exist");
            return Err(RenderError::UnknownFramebuffer(framebuffer));
        }
        self.compositor.add(framebuffer)
    }

    pub fn remove_framebuffer(&mut self, framebuffer: FramebufferId) -> Result<(), RenderError> {
        self.compositor.remove(framebuffer)
    }

    pub fn framebuffer_chain(&self) -> &[FramebufferId] {
        self.compositor.chain()
    }

    // ── camera ────────────────────────────────────────────────────────────

    /// Uses `camera` from the next `begin_frame`. The renderer keeps only a
    /// weak reference.
    pub fn set_camera(&mut self, camera: &Rc<RefCell<Camera>>) {
        self.camera = Some(Rc::downgrade(camera));
        self.camera_lost_logged = false;
    }

    pub fn camera(&self) -> Option<Rc<RefCell<Camera>>> {
        self.camera.as_ref().and_then(Weak::upgrade)
    }

    fn active_camera(&mut self) -> Camera {
        match self.camera.as_ref().map(Weak::upgrade) {
            Some(Some(camera)) => camera.borrow().clone(),
            Some(None) => {
                if !self.camera_lost_logged {
                    log::warn!("camera was dropped; using the default camera");
                    self.camera_lost_logged = true;
                }
                self.fallback_camera.clone()
            }
            None => self.fallback_camera.clone(),
        }
    }

    // ── resources and configuration ───────────────────────────────────────

    pub fn create_texture_array(
        &mut self,
        desc: &TextureArrayDesc<'_>,
    ) -> Result<TextureArray, RenderError> {
        let id = self.backend.create_texture_array(desc).map_err(|e| {
            log::error!("create_texture_array: {e}");
            e
        })?;
        let layers = desc.layers.len() as u32;
        self.texture_layers.insert(id, layers);
        log::debug!(
            "texture array '{}' {}x{} x{layers} ({:?})",
            desc.label,
            desc.width,
            desc.height,
            desc.format
        );
        Ok(TextureArray { id, width: desc.width, height: desc.height, layers })
    }

    /// Turns MSAA on or off between frames.
    pub fn set_msaa(&mut self, enabled: bool) -> Result<(), RenderError> {
        if self.phase != Phase::Idle {
            log::error!("set_msaa called mid-frame; ignored");
            return Ok(());
        }
        if enabled == self.config.msaa.enabled {
            return Ok(());
        }
        self.backend
            .configure_multisample(enabled.then_some(self.config.msaa.sample_count))?;
        self.config.msaa.enabled = enabled;
        log::info!("msaa {}", if enabled { "on" } else { "off" });
        Ok(())
    }

    /// Changes the MSAA sample count between frames.
    ///
    /// Panics unless `sample_count` is a power of two no greater than 16.
    pub fn set_msaa_sample_count(&mut self, sample_count: u32) -> Result<(), RenderError> {
        validate_sample_count(sample_count);
        if self.phase != Phase::Idle {
            log::error!("set_msaa_sample_count called mid-frame; ignored");
            return Ok(());
        }
        if self.config.msaa.enabled && sample_count != self.config.msaa.sample_count {
            self.backend.configure_multisample(Some(sample_count))?;
        }
        self.config.msaa.sample_count = sample_count;
        Ok(())
    }

    /// Resizes the surface and every surface-sized target. Zero sizes are
    /// ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("ignoring resize to {width}x{height}");
            return;
        }
        self.backend.resize(width, height);
        self.fallback_camera.set_aspect_ratio(width, height);
    }

    // ── introspection ─────────────────────────────────────────────────────

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn quad_batch(&self) -> &QuadBatch {
        &self.quad_batch
    }

    pub fn text_batch(&self) -> &TextBatch {
        &self.text_batch
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.backend.surface_size()
    }

    pub fn is_frame_open(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn is_layer_open(&self) -> bool {
        self.phase == Phase::Layer
    }

    /// The built-in 1×1 white texture array.
    pub fn white_texture(&self) -> TextureArray {
        self.white
    }

    pub fn stats(&self) -> RendererStats {
        RendererStats {
            quad_count: self.quad_batch.quad_count(),
            glyph_count: self.text_batch.quad_count(),
            draw_calls: self.counters.draw_calls,
            overflow_flushes: self.counters.overflow_flushes,
            fullscreen_passes: self.counters.fullscreen_passes,
            framebuffer_count: self.compositor.len(),
            msaa: self
                .config
                .msaa
                .enabled
                .then_some(self.config.msaa.sample_count),
            max_quads: self.config.max_quads,
            max_glyphs: self.config.max_glyphs,
        }
    }

    // ── flushing ──────────────────────────────────────────────────────────

    fn flush_quads(&mut self) {
        if self
            .quad_batch
            .flush(self.backend.as_mut(), self.camera_buffer, self.quad_textures)
            .is_some()
        {
            self.counters.draw_calls += 1;
        }
    }

    fn flush_text(&mut self) {
        if self
            .text_batch
            .flush(self.backend.as_mut(), self.camera_buffer, self.white.id)
            .is_some()
        {
            self.counters.draw_calls += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::{
        BackendCommand, BatchKind, CommandLog, RecordingBackend, RenderTarget,
    };
    use crate::render::text::tests::FixedFont;
    use crate::render::MsaaConfig;

    fn renderer(config: RendererConfig) -> (Renderer<'static>, CommandLog) {
        let (backend, log) = RecordingBackend::new(800, 600);
        let renderer = Renderer::new(backend, config).unwrap();
        log.clear();
        (renderer, log)
    }

    fn small(max_quads: u32, max_glyphs: u32) -> RendererConfig {
        RendererConfig { max_quads, max_glyphs, ..Default::default() }
    }

    fn font() -> FixedFont {
        FixedFont::new(TextureArrayId(42))
            .with('A', 10.0, Vec2::new(1.0, 8.0), Vec2::new(8.0, 8.0))
            .with('B', 6.0, Vec2::new(2.0, 7.0), Vec2::new(4.0, 9.0))
    }

    fn unit_quad(r: &mut Renderer<'_>, x: f32) {
        r.draw_quad(Vec2::new(x, 0.0), Vec2::splat(1.0), &TextureCoordinates::FULL, Color::WHITE);
    }

    #[test]
    fn quads_accumulate_four_vertices_each() {
        let (mut r, _log) = renderer(RendererConfig::default());
        r.begin_frame().unwrap();
        r.begin_layer();
        for i in 0..7 {
            unit_quad(&mut r, i as f32);
        }
        assert_eq!(r.quad_batch().quad_count(), 7);
        assert_eq!(r.quad_batch().sink().cursor(), 28);
        assert_eq!(r.stats().quad_count, 7);
    }

    #[test]
    fn end_layer_issues_one_draw_per_non_empty_batch() {
        let (mut r, log) = renderer(RendererConfig::default());
        let f = font();
        r.begin_frame().unwrap();
        r.begin_layer();
        r.draw_string("AB", &f, Vec2::zero(), 1.0, Color::WHITE);
        unit_quad(&mut r, 0.0);
        unit_quad(&mut r, 1.0);
        r.end_layer();

        let draws = log.batch_draws();
        assert_eq!(draws.len(), 2);
        // quads first even though the string was drawn first
        assert_eq!(draws[0].kind, BatchKind::Quad);
        assert_eq!(draws[0].index_count, 12);
        assert_eq!(draws[1].kind, BatchKind::Text);
        assert_eq!(draws[1].index_count, 12);
        assert_eq!(draws[1].textures, TextureArrayId(42));
        assert_eq!(r.quad_batch().quad_count(), 0);
        assert_eq!(r.text_batch().quad_count(), 0);
    }

    #[test]
    fn empty_layer_draws_nothing() {
        let (mut r, log) = renderer(RendererConfig::default());
        r.begin_frame().unwrap();
        r.begin_layer();
        r.draw_string("", &font(), Vec2::zero(), 1.0, Color::WHITE);
        r.end_layer();
        assert!(log.batch_draws().is_empty());
    }

    #[test]
    fn quad_overflow_flushes_exactly_once() {
        let (mut r, log) = renderer(small(4, 4));
        r.begin_frame().unwrap();
        r.begin_layer();
        for i in 0..4 {
            unit_quad(&mut r, i as f32);
        }
        assert!(log.batch_draws().is_empty());

        unit_quad(&mut r, 4.0);
        let draws = log.batch_draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].index_count, 4 * 6);
        assert_eq!(r.quad_batch().quad_count(), 1);
        assert_eq!(r.stats().overflow_flushes, 1);

        r.end_layer();
        let draws = log.batch_draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[1].index_count, 6);
        assert_eq!(r.stats().draw_calls, 2);
    }

    #[test]
    fn text_overflow_leaves_quad_batch_alone() {
        let (mut r, log) = renderer(small(8, 2));
        let f = font();
        r.begin_frame().unwrap();
        r.begin_layer();
        unit_quad(&mut r, 0.0);
        r.draw_string("ABA", &f, Vec2::zero(), 1.0, Color::WHITE);

        let draws = log.batch_draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].kind, BatchKind::Text);
        assert_eq!(draws[0].index_count, 12);
        assert_eq!(r.quad_batch().quad_count(), 1);
        assert_eq!(r.text_batch().quad_count(), 1);
    }

    #[test]
    fn draws_outside_a_layer_are_dropped() {
        let (mut r, log) = renderer(RendererConfig::default());
        r.begin_frame().unwrap();
        unit_quad(&mut r, 0.0);
        r.draw_string("A", &font(), Vec2::zero(), 1.0, Color::WHITE);
        assert_eq!(r.stats().quad_count, 0);
        assert_eq!(r.stats().glyph_count, 0);
        r.end_frame();
        assert!(log.batch_draws().is_empty());
    }

    #[test]
    fn uploaded_vertices_carry_tint_and_slice() {
        let (mut r, log) = renderer(RendererConfig::default());
        let tint = Color::rgba(0.5, 0.25, 1.0, 0.75);
        r.begin_frame().unwrap();
        r.begin_layer();
        r.draw_quad(Vec2::new(10.0, 20.0), Vec2::new(4.0, 2.0), &TextureCoordinates::FULL, tint);
        r.end_layer();

        let vertices = log.last_vertices(r.quad_batch().vertex_buffer());
        assert_eq!(vertices.len(), 4);
        assert_eq!(vertices[0].position, [8.0, 19.0]);
        assert_eq!(vertices[2].position, [12.0, 21.0]);
        assert!(vertices.iter().all(|v| v.tint == tint.to_array()));
        assert!(vertices.iter().all(|v| v.texcoord[2] == 0.0));
    }

    fn glyph_positions(log: &CommandLog, r: &Renderer<'_>) -> Vec<Vec2> {
        log.last_vertices(r.text_batch().vertex_buffer())
            .iter()
            .map(|v| Vec2::new(v.position[0], v.position[1]))
            .collect()
    }

    #[test]
    fn pen_advances_between_glyphs() {
        let (mut r, log) = renderer(RendererConfig::default());
        r.begin_frame().unwrap();
        r.begin_layer();
        r.draw_string("AB", &font(), Vec2::zero(), 1.0, Color::WHITE);
        r.end_layer();

        let p = glyph_positions(&log, &r);
        assert_eq!(p.len(), 8);
        // A: pen -8, bearing (1, 8), size 8x8
        assert_eq!(p[..4], [
            Vec2::new(-7.0, -8.0),
            Vec2::new(1.0, -8.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(-7.0, 0.0),
        ]);
        // B: pen -8 + 10, bearing (2, 7), size 4x9
        assert_eq!(p[4].x, -8.0 + 10.0 + 2.0);
        assert_eq!(p[4..], [
            Vec2::new(4.0, -7.0),
            Vec2::new(8.0, -7.0),
            Vec2::new(8.0, 2.0),
            Vec2::new(4.0, 2.0),
        ]);
    }

    #[test]
    fn rotated_glyphs_follow_the_rotated_pen() {
        let angle = std::f32::consts::FRAC_PI_2;
        let scale = 1.5;
        let origin = Vec2::new(5.0, -3.0);
        let f = font();

        let (mut r, log) = renderer(RendererConfig::default());
        r.begin_frame().unwrap();
        r.begin_layer();
        r.draw_string_rotated("AB", &f, origin, angle, scale, Color::WHITE);
        r.end_layer();
        let actual = glyph_positions(&log, &r);

        // Written out independently: cos/sin pre-multiplied by scale, the
        // pen starts half the scaled advance back along the rotated axis.
        let (c, s) = (angle.cos() * scale, angle.sin() * scale);
        let total: f32 = "AB".chars().map(|ch| f.glyph(ch).unwrap().advance).sum();
        let start = Vec2::new(origin.x - total * c / 2.0, origin.y - total * s / 2.0);
        let mut advance = Vec2::zero();
        let mut expected = Vec::new();
        for ch in "AB".chars() {
            let g = f.glyph(ch).unwrap();
            let bearing = Vec2::new(
                g.bearing.x * c + g.bearing.y * s,
                g.bearing.x * s - g.bearing.y * c,
            );
            let top_left = start + advance + bearing;
            advance += Vec2::new(g.advance * c, g.advance * s);
            let (wc, ws) = (g.size.scale(Vec2::splat(c)), g.size.scale(Vec2::splat(s)));
            expected.extend([
                top_left,
                top_left + Vec2::new(wc.x, ws.x),
                top_left + Vec2::new(wc.x - ws.y, ws.x + wc.y),
                top_left + Vec2::new(-ws.y, wc.y),
            ]);
        }

        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(&expected) {
            assert!((a.x - e.x).abs() < 1e-5 && (a.y - e.y).abs() < 1e-5, "{a:?} != {e:?}");
        }
        // B sits one scaled advance of A (plus the bearing difference) further along +Y
        assert!((actual[4].y - actual[0].y - (10.0 + 2.0 - 1.0) * scale).abs() < 1e-4);
    }

    #[test]
    fn begin_frame_uploads_camera_and_binds_backbuffer() {
        let (mut r, log) = renderer(RendererConfig::default());
        let camera = Rc::new(RefCell::new(Camera::new(Vec2::new(3.0, 4.0), 2.0, 50.0)));
        r.set_camera(&camera);
        r.begin_frame().unwrap();

        let expected = camera.borrow().uniform();
        let commands = log.commands();
        assert_eq!(commands[0], BackendCommand::AcquireFrame);
        assert_eq!(
            commands[1],
            BackendCommand::WriteBuffer {
                buffer: r.camera_buffer,
                bytes: bytemuck::bytes_of(&expected).to_vec(),
            }
        );
        assert_eq!(log.bound_targets(), vec![RenderTarget::Backbuffer]);
    }

    #[test]
    fn dropped_camera_falls_back_to_default() {
        let (mut r, _log) = renderer(RendererConfig::default());
        let camera = Rc::new(RefCell::new(Camera::new(Vec2::new(3.0, 4.0), 2.0, 50.0)));
        r.set_camera(&camera);
        drop(camera);

        assert!(r.camera().is_none());
        assert_eq!(r.active_camera().position, Vec2::zero());
        assert_eq!(r.active_camera().zoom, 1000.0);
    }

    #[test]
    fn framebuffer_chain_composites_in_order() {
        let (mut r, log) = renderer(RendererConfig::default());
        let f: Vec<_> = (0..3)
            .map(|i| r.create_framebuffer(&format!("fb{i}"), PostEffect::Passthrough))
            .collect();
        for &id in &f {
            r.add_framebuffer(id).unwrap();
        }

        r.begin_frame().unwrap();
        r.begin_layer();
        unit_quad(&mut r, 0.0);
        r.end_layer();
        r.end_frame();

        assert_eq!(log.bound_targets()[0], RenderTarget::Framebuffer(f[0]));
        assert_eq!(
            log.fullscreen_draws(),
            vec![
                (f[0], RenderTarget::Framebuffer(f[1])),
                (f[1], RenderTarget::Framebuffer(f[2])),
                (f[2], RenderTarget::Backbuffer),
            ]
        );
        assert_eq!(r.stats().fullscreen_passes, 3);
        assert_eq!(log.commands().last(), Some(&BackendCommand::Present));
    }

    #[test]
    fn chain_mutation_errors_leave_chain_unchanged() {
        let (mut r, _log) = renderer(RendererConfig::default());
        let a = r.create_framebuffer("a", PostEffect::Passthrough);
        let b = r.create_framebuffer("b", PostEffect::Invert);

        r.add_framebuffer(a).unwrap();
        assert_eq!(r.add_framebuffer(a), Err(RenderError::FramebufferAlreadyInChain(a)));
        assert_eq!(r.framebuffer_chain(), &[a]);

        assert_eq!(r.remove_framebuffer(b), Err(RenderError::FramebufferNotInChain(b)));
        assert_eq!(r.framebuffer_chain(), &[a]);
    }

    #[test]
    fn destroying_a_chained_framebuffer_unlinks_it() {
        let (mut r, log) = renderer(RendererConfig::default());
        let a = r.create_framebuffer("a", PostEffect::Passthrough);
        let b = r.create_framebuffer("b", PostEffect::Grayscale);
        r.add_framebuffer(a).unwrap();
        r.add_framebuffer(b).unwrap();

        r.destroy_framebuffer(a).unwrap();
        assert_eq!(r.framebuffer_chain(), &[b]);
        assert!(log.commands().contains(&BackendCommand::DestroyFramebuffer { id: a }));
        assert_eq!(r.add_framebuffer(a), Err(RenderError::UnknownFramebuffer(a)));
    }

    #[test]
    fn msaa_without_chain_resolves_to_backbuffer() {
        let mut config = RendererConfig::default();
        config.msaa.enabled = true;
        let (mut r, log) = renderer(config);

        r.begin_frame().unwrap();
        r.end_frame();

        assert_eq!(log.bound_targets(), vec![RenderTarget::Multisample]);
        assert!(log.commands().contains(&BackendCommand::ResolveMultisample {
            destination: RenderTarget::Backbuffer
        }));
        assert_eq!(r.stats().msaa, Some(4));
    }

    #[test]
    fn msaa_with_chain_resolves_into_first_framebuffer() {
        let (mut r, log) = renderer(RendererConfig::default());
        let a = r.create_framebuffer("a", PostEffect::Passthrough);
        r.add_framebuffer(a).unwrap();
        r.set_msaa(true).unwrap();

        r.begin_frame().unwrap();
        r.end_frame();

        assert_eq!(log.bound_targets()[0], RenderTarget::Multisample);
        assert!(log.commands().contains(&BackendCommand::ResolveMultisample {
            destination: RenderTarget::Framebuffer(a)
        }));
        assert_eq!(log.fullscreen_draws(), vec![(a, RenderTarget::Backbuffer)]);
    }

    #[test]
    fn set_msaa_is_ignored_mid_frame() {
        let (mut r, log) = renderer(RendererConfig::default());
        r.begin_frame().unwrap();
        r.set_msaa(true).unwrap();
        assert_eq!(r.stats().msaa, None);
        assert!(!log.commands().iter().any(|c| matches!(c, BackendCommand::ConfigureMultisample { .. })));
    }

    #[test]
    fn unsupported_msaa_at_startup_falls_back_to_single_sample() {
        let (backend, log) = RecordingBackend::new(800, 600);
        let mut config = RendererConfig::default();
        config.msaa = MsaaConfig { enabled: true, sample_count: 8 };
        let mut r = Renderer::new(backend.with_max_samples(4), config).unwrap();

        assert!(!r.config().msaa.enabled);
        assert_eq!(r.stats().msaa, None);

        log.clear();
        r.begin_frame().unwrap();
        r.end_frame();
        assert_eq!(log.bound_targets(), vec![RenderTarget::Backbuffer]);
        assert!(!log.commands().iter().any(|c| matches!(c, BackendCommand::ResolveMultisample { .. })));
    }

    #[test]
    #[should_panic(expected = "not a power of 2")]
    fn odd_sample_count_is_fatal() {
        let (mut r, _log) = renderer(RendererConfig::default());
        let _ = r.set_msaa_sample_count(3);
    }

    #[test]
    fn switching_texture_array_flushes_pending_quads() {
        let (mut r, log) = renderer(RendererConfig::default());
        let texel = [0u8; 4];
        let layers: [&[u8]; 2] = [&texel, &texel];
        let array = r
            .create_texture_array(&TextureArrayDesc {
                label: "tiles",
                width: 1,
                height: 1,
                format: TextureArrayFormat::Rgba8,
                layers: &layers,
            })
            .unwrap();

        r.begin_frame().unwrap();
        r.begin_layer();
        unit_quad(&mut r, 0.0);
        r.set_texture_array(Some(array.id));
        r.draw_quad(Vec2::zero(), Vec2::splat(1.0), &TextureCoordinates::layer(1), Color::WHITE);
        r.end_layer();

        let draws = log.batch_draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].textures, r.white_texture().id);
        assert_eq!(draws[1].textures, array.id);
    }

    #[test]
    fn end_frame_closes_an_open_layer() {
        let (mut r, log) = renderer(RendererConfig::default());
        r.begin_frame().unwrap();
        r.begin_layer();
        unit_quad(&mut r, 0.0);
        r.end_frame();

        assert_eq!(log.batch_draws().len(), 1);
        assert!(!r.is_frame_open());
    }

    #[test]
    fn resize_ignores_zero_extent() {
        let (mut r, log) = renderer(RendererConfig::default());
        r.resize(0, 600);
        assert!(log.is_empty());
        r.resize(1024, 512);
        assert_eq!(r.surface_size(), (1024, 512));
        assert_eq!(r.fallback_camera.aspect_ratio, 2.0);
    }
}
