use super::backend::{FramebufferId, GraphicsBackend, RenderTarget};
use super::RenderError;

/// Ordered chain of offscreen targets composited at the end of a frame.
///
/// The first target receives the frame's draws (or the MSAA resolve); each
/// later target samples its predecessor, and the last one is drawn to the
/// backbuffer.
#[derive(Debug, Default, Clone)]
pub struct FrameCompositor {
    chain: Vec<FramebufferId>,
}

impl FrameCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain(&self) -> &[FramebufferId] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn contains(&self, framebuffer: FramebufferId) -> bool {
        self.chain.contains(&framebuffer)
    }

    /// Appends `framebuffer`. A duplicate is logged and rejected; the chain
    /// is left unchanged.
    pub fn add(&mut self, framebuffer: FramebufferId) -> Result<(), RenderError> {
        if self.contains(framebuffer) {
            log::error!("framebuffer {framebuffer:?} is already in the chain");
            return Err(RenderError::FramebufferAlreadyInChain(framebuffer));
        }
        self.chain.push(framebuffer);
        log::debug!("framebuffer chain: {:?}", self.chain);
        Ok(())
    }

    /// Removes `framebuffer`, keeping the order of the rest. An absent
    /// handle is logged and rejected.
    pub fn remove(&mut self, framebuffer: FramebufferId) -> Result<(), RenderError> {
        let Some(index) = self.chain.iter().position(|&f| f == framebuffer) else {
            log::error!("framebuffer {framebuffer:?} is not in the chain");
            return Err(RenderError::FramebufferNotInChain(framebuffer));
        };
        self.chain.remove(index);
        log::debug!("framebuffer chain: {:?}", self.chain);
        Ok(())
    }

    /// Target the frame's draws go to.
    pub fn primary_target(&self, msaa: bool) -> RenderTarget {
        if msaa {
            RenderTarget::Multisample
        } else if let Some(&first) = self.chain.first() {
            RenderTarget::Framebuffer(first)
        } else {
            RenderTarget::Backbuffer
        }
    }

    /// Resolves and composites the frame. Returns the number of full-screen
    /// passes issued.
    pub(crate) fn composite(&self, backend: &mut dyn GraphicsBackend, msaa: bool) -> u32 {
        let (Some(&first), Some(&last)) = (self.chain.first(), self.chain.last()) else {
            if msaa {
                backend.resolve_multisample(RenderTarget::Backbuffer);
            }
            return 0;
        };

        if msaa {
            backend.resolve_multisample(RenderTarget::Framebuffer(first));
        }

        let mut passes = 0;
        for pair in self.chain.windows(2) {
            backend.bind_target(RenderTarget::Framebuffer(pair[1]));
            backend.draw_fullscreen(pair[0]);
            passes += 1;
        }

        backend.bind_target(RenderTarget::Backbuffer);
        backend.draw_fullscreen(last);
        passes + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::{BackendCommand, PostEffect, RecordingBackend};

    fn chain_of(backend: &mut RecordingBackend, n: usize) -> (FrameCompositor, Vec<FramebufferId>) {
        let mut compositor = FrameCompositor::new();
        let ids: Vec<_> = (0..n)
            .map(|i| backend.create_framebuffer(&format!("fb{i}"), &PostEffect::Passthrough))
            .collect();
        for &id in &ids {
            compositor.add(id).unwrap();
        }
        (compositor, ids)
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let (mut backend, _log) = RecordingBackend::new(8, 8);
        let (mut compositor, ids) = chain_of(&mut backend, 1);
        assert_eq!(
            compositor.add(ids[0]),
            Err(RenderError::FramebufferAlreadyInChain(ids[0]))
        );
        assert_eq!(compositor.chain(), &ids[..]);
    }

    #[test]
    fn removing_absent_handle_leaves_chain_unchanged() {
        let (mut backend, _log) = RecordingBackend::new(8, 8);
        let (mut compositor, ids) = chain_of(&mut backend, 2);
        compositor.remove(ids[0]).unwrap();
        assert_eq!(
            compositor.remove(ids[0]),
            Err(RenderError::FramebufferNotInChain(ids[0]))
        );
        assert_eq!(compositor.chain(), &ids[1..]);
    }

    #[test]
    fn chain_composites_in_insertion_order() {
        let (mut backend, log) = RecordingBackend::new(8, 8);
        let (compositor, f) = chain_of(&mut backend, 3);
        log.clear();

        assert_eq!(compositor.composite(&mut backend, false), 3);
        assert_eq!(
            log.fullscreen_draws(),
            vec![
                (f[0], RenderTarget::Framebuffer(f[1])),
                (f[1], RenderTarget::Framebuffer(f[2])),
                (f[2], RenderTarget::Backbuffer),
            ]
        );
        assert!(
            !log.commands()
                .iter()
                .any(|c| matches!(c, BackendCommand::ResolveMultisample { .. }))
        );
    }

    #[test]
    fn msaa_resolves_into_first_target() {
        let (mut backend, log) = RecordingBackend::new(8, 8);
        let (compositor, f) = chain_of(&mut backend, 2);
        log.clear();

        compositor.composite(&mut backend, true);
        assert_eq!(
            log.commands()[0],
            BackendCommand::ResolveMultisample {
                destination: RenderTarget::Framebuffer(f[0])
            }
        );
    }

    #[test]
    fn empty_chain_resolves_to_backbuffer_or_does_nothing() {
        let (mut backend, log) = RecordingBackend::new(8, 8);
        let compositor = FrameCompositor::new();

        assert_eq!(compositor.composite(&mut backend, false), 0);
        assert!(log.is_empty());

        compositor.composite(&mut backend, true);
        assert_eq!(
            *log.commands(),
            vec![BackendCommand::ResolveMultisample {
                destination: RenderTarget::Backbuffer
            }]
        );
    }

    #[test]
    fn primary_target_prefers_multisample_then_chain() {
        let (mut backend, _log) = RecordingBackend::new(8, 8);
        let (compositor, f) = chain_of(&mut backend, 1);
        assert_eq!(compositor.primary_target(true), RenderTarget::Multisample);
        assert_eq!(compositor.primary_target(false), RenderTarget::Framebuffer(f[0]));
        assert_eq!(
            FrameCompositor::new().primary_target(false),
            RenderTarget::Backbuffer
        );
    }
}
