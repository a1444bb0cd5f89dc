//! Colors.

mod color;

pub use color::Color;
pub(crate) use color::unorm8;
