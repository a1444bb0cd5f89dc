//! Tricolor engine crate.
//!
//! A vertex-index-driven triangle fixture for checking that a wgpu render
//! pipeline is wired correctly, plus the GPU plumbing to draw it in a window,
//! render it headlessly and verify the result against a CPU reference.

pub mod core;
pub mod device;
pub mod fixture;
pub mod logging;
pub mod paint;
pub mod render;
pub mod resources;
pub mod time;
pub mod verify;
pub mod window;
