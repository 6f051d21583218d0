use winit::window::Window;

use crate::render::Renderer;
use crate::time::FrameTime;

/// Per-frame context passed to [`App::on_frame`](super::App::on_frame).
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window borrow carried by the renderer's backend
pub struct FrameCtx<'a, 'w> {
    pub window: &'a Window,
    pub renderer: &'a mut Renderer<'w>,
    pub time: FrameTime,
}

impl<'w> FrameCtx<'_, 'w> {
    /// Drawable size in physical pixels.
    pub fn surface_size(&self) -> (u32, u32) {
        self.renderer.surface_size()
    }

    /// Runs `draw` inside one `begin_layer`/`end_layer` pair.
    pub fn layer<F>(&mut self, draw: F)
    where
        F: FnOnce(&mut Renderer<'w>),
    {
        self.renderer.begin_layer();
        draw(&mut *self.renderer);
        self.renderer.end_layer();
    }
}
