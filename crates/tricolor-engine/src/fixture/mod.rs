//! CPU reference of the triangle fixture.
//!
//! The GPU fixture synthesizes its geometry from the built-in vertex index; this
//! module mirrors that mapping and predicts the rasterized result so headless
//! renders and probe readbacks can be checked numerically.

mod raster;
mod vertex;

pub use raster::{barycentric, expected_color, is_exterior, is_interior, pixel_center_ndc};
pub use vertex::{
    triangle_vertex, try_triangle_vertex, TriangleVertex, VertexIndexError, TRIANGLE,
    VERTEX_COUNT,
};
