use std::fmt;

use bytemuck::{Pod, Zeroable};

/// Number of vertices the fixture draws.
pub const VERTEX_COUNT: u32 = 3;

/// One output of the fixture's vertex stage.
///
/// `position` is homogeneous clip space; `color` is linear RGB and becomes the
/// single varying consumed by the fragment stage.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct TriangleVertex {
    pub position: [f32; 4],
    pub color: [f32; 3],
}

impl TriangleVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x4, // position
        1 => Float32x3  // color
    ];

    /// Vertex buffer layout used by the buffered pipeline variant.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TriangleVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }

    /// Position after perspective division (`w` is always 1 for the fixture).
    #[inline]
    pub fn ndc(&self) -> [f32; 2] {
        let w = self.position[3];
        [self.position[0] / w, self.position[1] / w]
    }
}

/// The three fixture vertices in index order: red bottom-left, green top-center,
/// blue bottom-right.
pub const TRIANGLE: [TriangleVertex; 3] = [
    TriangleVertex {
        position: [-1.0, -1.0, 0.0, 1.0],
        color: [1.0, 0.0, 0.0],
    },
    TriangleVertex {
        position: [0.0, 1.0, 0.0, 1.0],
        color: [0.0, 1.0, 0.0],
    },
    TriangleVertex {
        position: [1.0, -1.0, 0.0, 1.0],
        color: [0.0, 0.0, 1.0],
    },
];

/// CPU mirror of the fixture's vertex stage.
///
/// Total over `u32`: any index other than 0 or 1 takes the same branch as 2,
/// exactly like the shader's `else`.
#[inline]
pub fn triangle_vertex(index: u32) -> TriangleVertex {
    match index {
        0 => TRIANGLE[0],
        1 => TRIANGLE[1],
        _ => TRIANGLE[2],
    }
}

/// Strict variant of [`triangle_vertex`]: only 0, 1 and 2 are accepted.
pub fn try_triangle_vertex(index: u32) -> Result<TriangleVertex, VertexIndexError> {
    if index < VERTEX_COUNT {
        Ok(TRIANGLE[index as usize])
    } else {
        Err(VertexIndexError { index })
    }
}

/// A vertex index outside the fixture's `0..3` range.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexIndexError {
    pub index: u32,
}

impl fmt::Display for VertexIndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vertex index {} is outside the fixture range 0..{}",
            self.index, VERTEX_COUNT
        )
    }
}

impl std::error::Error for VertexIndexError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_zero_is_red_bottom_left() {
        let v = triangle_vertex(0);
        assert_eq!(v.position, [-1.0, -1.0, 0.0, 1.0]);
        assert_eq!(v.color, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn index_one_is_green_top() {
        let v = triangle_vertex(1);
        assert_eq!(v.position, [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(v.color, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn index_two_is_blue_bottom_right() {
        let v = triangle_vertex(2);
        assert_eq!(v.position, [1.0, -1.0, 0.0, 1.0]);
        assert_eq!(v.color, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn out_of_range_falls_back_to_index_two() {
        for index in [3, 4, 17, 1024, u32::MAX] {
            assert_eq!(triangle_vertex(index), triangle_vertex(2), "index {index}");
        }
    }

    #[test]
    fn strict_accepts_fixture_range() {
        for index in 0..VERTEX_COUNT {
            assert_eq!(try_triangle_vertex(index), Ok(triangle_vertex(index)));
        }
    }

    #[test]
    fn strict_rejects_out_of_range() {
        let err = try_triangle_vertex(3).unwrap_err();
        assert_eq!(err, VertexIndexError { index: 3 });
        assert_eq!(err.to_string(), "vertex index 3 is outside the fixture range 0..3");
    }

    #[test]
    fn layout_stride_matches_struct() {
        // 4 + 3 floats, no padding under repr(C).
        assert_eq!(TriangleVertex::layout().array_stride, 28);
    }

    #[test]
    fn ndc_divides_by_w() {
        let v = TriangleVertex { position: [2.0, -4.0, 0.0, 2.0], color: [0.0; 3] };
        assert_eq!(v.ndc(), [1.0, -2.0]);
    }
}
