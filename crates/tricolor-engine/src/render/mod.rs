//! GPU rendering.
//!
//! - [`TriangleRenderer`]: the fixture draw (3 vertices, non-indexed)
//! - [`OffscreenTarget`] / [`render_offscreen`]: headless render + readback
//! - [`VertexProbe`]: evaluates the WGSL generator for arbitrary indices
//!
//! Shaders live in `shaders/`; `generator.wgsl` is prepended to every built-in
//! module so the render and probe paths run the same generator.

mod ctx;
mod offscreen;
mod probe;
mod triangle;

pub use ctx::{RenderCtx, RenderTarget};
pub use offscreen::{render_offscreen, OffscreenTarget, RgbaImage, OFFSCREEN_FORMAT};
pub use probe::VertexProbe;
pub use triangle::{FixtureSource, TriangleRenderer};
