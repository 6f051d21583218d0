use winit::event::WindowEvent;

use crate::render::Renderer;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by [`Runtime`](crate::window::Runtime).
pub trait App {
    /// Called once after the renderer exists, before the first frame.
    /// Upload texture arrays and fonts and create framebuffers here.
    fn on_init(&mut self, renderer: &mut Renderer<'_>) -> anyhow::Result<()> {
        let _ = renderer;
        Ok(())
    }

    /// Called for every window event before the runtime handles it.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called after the surface was resized (physical pixels).
    fn on_resize(&mut self, width: u32, height: u32) {
        let _ = (width, height);
    }

    /// Called before each frame, while no frame is open. Framebuffer chain
    /// and MSAA changes belong here.
    fn on_update(&mut self, renderer: &mut Renderer<'_>) {
        let _ = renderer;
    }

    /// Called once per frame between `begin_frame` and `end_frame`. Draw in
    /// one or more layers.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;
}
