//! Window + event loop.
//!
//! Owns the `winit` event loop and a single window wired to a [`Gpu`](crate::device::Gpu).

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
