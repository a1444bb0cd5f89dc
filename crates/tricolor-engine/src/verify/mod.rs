//! Checks a rendered fixture image against the CPU reference.
//!
//! Pixels whose centers sit within `edge_margin` (in barycentric weight) of a
//! triangle edge are skipped: their coverage depends on the rasterizer's
//! tie-breaking rules, not on the fixture.

use std::fmt;

use crate::fixture::{expected_color, is_exterior, is_interior, pixel_center_ndc};
use crate::paint::{unorm8, Color};
use crate::render::RgbaImage;

/// Verification tolerances.
#[derive(Debug, Copy, Clone)]
pub struct VerifyConfig {
    /// Color the target was cleared to; expected outside the triangle.
    pub clear: Color,
    /// Largest accepted per-channel difference, in 8-bit steps.
    pub tolerance: u8,
    /// Barycentric distance from an edge inside which pixels are not checked.
    pub edge_margin: f32,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            clear: Color::BLACK,
            tolerance: 3,
            edge_margin: 0.02,
        }
    }
}

/// First mismatching pixel, kept for diagnostics.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub x: u32,
    pub y: u32,
    pub expected: [u8; 4],
    pub actual: [u8; 4],
}

/// Outcome of [`verify_image`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub interior_checked: u32,
    pub exterior_checked: u32,
    pub mismatches: u32,
    pub first_mismatch: Option<Mismatch>,
}

impl Report {
    /// Passes when at least one pixel on each side was checked and none differ.
    pub fn is_pass(&self) -> bool {
        self.mismatches == 0 && self.interior_checked > 0 && self.exterior_checked > 0
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} interior / {} exterior pixels checked, {} mismatches",
            self.interior_checked, self.exterior_checked, self.mismatches
        )?;
        if let Some(m) = self.first_mismatch {
            write!(
                f,
                " (first at {},{}: expected {:?}, got {:?})",
                m.x, m.y, m.expected, m.actual
            )?;
        }
        Ok(())
    }
}

/// Compares every non-edge pixel of `image` with the reference.
pub fn verify_image(image: &RgbaImage, config: &VerifyConfig) -> Report {
    let mut report = Report::default();
    let background = config.clear.to_rgba8();

    for y in 0..image.height {
        for x in 0..image.width {
            let p = pixel_center_ndc(x, y, image.width, image.height);

            let interior = is_interior(p, config.edge_margin)
                .then(|| expected_color(p))
                .flatten();

            let expected = if let Some([r, g, b]) = interior {
                report.interior_checked += 1;
                [unorm8(r), unorm8(g), unorm8(b), 255]
            } else if is_exterior(p, config.edge_margin) {
                report.exterior_checked += 1;
                background
            } else {
                continue;
            };

            let actual = image.pixel(x, y);
            if !within(expected, actual, config.tolerance) {
                report.mismatches += 1;
                report.first_mismatch.get_or_insert(Mismatch {
                    x,
                    y,
                    expected,
                    actual,
                });
            }
        }
    }

    report
}

fn within(a: [u8; 4], b: [u8; 4], tolerance: u8) -> bool {
    a.iter().zip(b).all(|(&x, y)| x.abs_diff(y) <= tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Software rendition of the fixture: exact reference colors, edges filled
    /// with the clear color.
    fn reference_image(width: u32, height: u32) -> RgbaImage {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let p = pixel_center_ndc(x, y, width, height);
                let px = match expected_color(p) {
                    Some([r, g, b]) => [unorm8(r), unorm8(g), unorm8(b), 255],
                    None => [0, 0, 0, 255],
                };
                pixels.extend_from_slice(&px);
            }
        }
        RgbaImage::from_raw(width, height, pixels).unwrap()
    }

    #[test]
    fn reference_rendition_passes() {
        let report = verify_image(&reference_image(64, 48), &VerifyConfig::default());
        assert!(report.is_pass(), "{report}");
        assert!(report.interior_checked > 0);
        assert!(report.exterior_checked > 0);
    }

    #[test]
    fn blank_image_fails_inside() {
        let img = RgbaImage::from_raw(32, 32, [0, 0, 0, 255].repeat(32 * 32)).unwrap();
        let report = verify_image(&img, &VerifyConfig::default());
        assert!(!report.is_pass());
        assert_eq!(report.mismatches, report.interior_checked);
        assert!(report.first_mismatch.is_some());
    }

    #[test]
    fn wrong_clear_color_fails_outside() {
        let img = reference_image(32, 32);
        let config = VerifyConfig {
            clear: Color::WHITE,
            ..VerifyConfig::default()
        };
        let report = verify_image(&img, &config);
        assert_eq!(report.mismatches, report.exterior_checked);
    }

    #[test]
    fn tolerance_absorbs_small_drift() {
        let mut img = reference_image(16, 16);
        for b in img.pixels.iter_mut().step_by(4) {
            *b = b.saturating_add(2);
        }
        assert!(verify_image(&img, &VerifyConfig::default()).is_pass());
    }

    #[test]
    fn counts_only_compared_pixels() {
        let img = reference_image(40, 40);
        let config = VerifyConfig::default();
        let report = verify_image(&img, &config);

        let (mut interior, mut exterior) = (0, 0);
        for y in 0..40 {
            for x in 0..40 {
                let p = pixel_center_ndc(x, y, 40, 40);
                if is_interior(p, config.edge_margin) {
                    assert!(expected_color(p).is_some(), "interior ({x}, {y}) has no color");
                    interior += 1;
                } else if is_exterior(p, config.edge_margin) {
                    exterior += 1;
                }
            }
        }
        assert_eq!(report.interior_checked, interior);
        assert_eq!(report.exterior_checked, exterior);
        assert!(interior + exterior < 40 * 40, "edge band should be skipped");
    }

    #[test]
    fn empty_report_does_not_pass() {
        assert!(!Report::default().is_pass());
    }
}
