use super::vertex::TRIANGLE;

/// NDC of the center of pixel `(x, y)` in a `width` x `height` target.
///
/// Row 0 is the top of the target, which maps to NDC y = +1.
#[inline]
pub fn pixel_center_ndc(x: u32, y: u32, width: u32, height: u32) -> [f32; 2] {
    let w = width.max(1) as f32;
    let h = height.max(1) as f32;
    [
        (x as f32 + 0.5) / w * 2.0 - 1.0,
        1.0 - (y as f32 + 0.5) / h * 2.0,
    ]
}

/// Barycentric weights of `p` with respect to the fixture corners, in vertex
/// index order. Weights sum to 1; any negative weight means `p` is outside.
pub fn barycentric(p: [f32; 2]) -> [f32; 3] {
    let [a, b, c] = TRIANGLE.map(|v| v.ndc());

    let denom = (b[1] - c[1]) * (a[0] - c[0]) + (c[0] - b[0]) * (a[1] - c[1]);
    let w0 = ((b[1] - c[1]) * (p[0] - c[0]) + (c[0] - b[0]) * (p[1] - c[1])) / denom;
    let w1 = ((c[1] - a[1]) * (p[0] - c[0]) + (a[0] - c[0]) * (p[1] - c[1])) / denom;

    [w0, w1, 1.0 - w0 - w1]
}

/// True when every barycentric weight of `p` exceeds `margin`.
///
/// A positive margin excludes pixels near the edges, whose coverage depends on
/// the rasterizer's tie-breaking rules.
#[inline]
pub fn is_interior(p: [f32; 2], margin: f32) -> bool {
    barycentric(p).iter().all(|&w| w > margin)
}

/// True when some barycentric weight of `p` is below `-margin`.
#[inline]
pub fn is_exterior(p: [f32; 2], margin: f32) -> bool {
    barycentric(p).iter().any(|&w| w < -margin)
}

/// Linearly interpolated fixture color at `p`, or `None` outside the triangle.
pub fn expected_color(p: [f32; 2]) -> Option<[f32; 3]> {
    let weights = barycentric(p);
    if weights.iter().any(|&w| w < 0.0) {
        return None;
    }

    let mut rgb = [0.0f32; 3];
    for (w, v) in weights.iter().zip(TRIANGLE.iter()) {
        for (channel, c) in rgb.iter_mut().zip(v.color) {
            *channel += w * c;
        }
    }
    Some(rgb)
}
