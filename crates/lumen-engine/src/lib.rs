//! Lumen engine crate.
//!
//! A frame-batching 2D renderer: quads and glyph quads are accumulated into
//! fixed-capacity vertex sinks, flushed into a minimal number of indexed draw
//! calls, and composited through an optional chain of offscreen framebuffers.

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod paint;
pub mod render;
pub mod text;
