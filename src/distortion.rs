//! Radial barrel distortion
//!
//! Pre-warps geometry so that, once magnified by the headset lens, the image
//! looks geometrically correct again.

use glam::Vec2;

/// Applies the inverse radial barrel distortion to `point`.
///
/// With `r = |point|`, the point is scaled by `r / (a·r³ + b·r² + c·r + d)·r`
/// where `d = 1 - a - b - c` keeps the unit circle fixed. The origin maps to
/// itself. No clamping is performed; coefficients that push the polynomial
/// through zero produce non-finite output.
///
/// The arithmetic runs in f64 so the radius neither underflows nor overflows
/// for any finite f32 input.
pub fn barrel_distort(param_a: f32, param_b: f32, param_c: f32, point: Vec2) -> Vec2 {
    if point == Vec2::ZERO {
        return point;
    }

    let (a, b, c) = (param_a as f64, param_b as f64, param_c as f64);
    let d = 1.0 - a - b - c;
    let (x, y) = (point.x as f64, point.y as f64);

    let dst_r = x.hypot(y);
    let src_r = (a * dst_r * dst_r * dst_r + b * dst_r * dst_r + c * dst_r + d) * dst_r;
    let factor = (dst_r / src_r).abs();

    Vec2::new((x * factor) as f32, (y * factor) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_coefficients_are_identity() {
        let points = [
            Vec2::new(0.3, -0.7),
            Vec2::new(-1.0, 1.0),
            Vec2::new(1e-6, 2.5),
            Vec2::new(-123.25, 0.0),
        ];
        for p in points {
            assert_eq!(barrel_distort(0.0, 0.0, 0.0, p), p);
        }
    }

    #[test]
    fn zero_coefficients_are_identity_at_extreme_magnitudes() {
        let points = [
            Vec2::new(1e-30, 0.0),
            Vec2::new(0.0, -1e-38),
            Vec2::new(f32::MIN_POSITIVE, f32::MIN_POSITIVE),
            Vec2::new(1e-45, 0.0),
            Vec2::new(1e20, 0.0),
            Vec2::new(-3e38, 3e38),
            Vec2::new(f32::MAX, f32::MIN),
        ];
        for p in points {
            assert_eq!(barrel_distort(0.0, 0.0, 0.0, p), p, "{p:?}");
        }
    }

    #[test]
    fn tiny_points_stay_finite_with_lens_coefficients() {
        let out = barrel_distort(-0.068, 0.32, -0.2, Vec2::new(1e-30, -1e-30));
        assert!(out.is_finite());
        assert!(out.x > 0.0 && out.y < 0.0);
    }

    #[test]
    fn origin_is_fixed() {
        assert_eq!(barrel_distort(-0.068, 0.32, -0.2, Vec2::ZERO), Vec2::ZERO);
    }

    #[test]
    fn repeated_calls_are_bit_identical() {
        let p = Vec2::new(0.61, -0.42);
        let first = barrel_distort(-0.068, 0.32, -0.2, p);
        let second = barrel_distort(-0.068, 0.32, -0.2, p);
        assert_eq!(first.x.to_bits(), second.x.to_bits());
        assert_eq!(first.y.to_bits(), second.y.to_bits());
    }

    #[test]
    fn unit_circle_is_preserved() {
        // d = 1 - a - b - c makes the polynomial evaluate to 1 at r = 1
        let p = Vec2::new(0.6, 0.8);
        let out = barrel_distort(-0.068, 0.32, -0.2, p);
        assert!((out - p).length() < 1e-5);
    }

    #[test]
    fn direction_is_kept_and_radius_changes() {
        let p = Vec2::new(0.3, 0.4);
        let out = barrel_distort(0.0, 0.5, 0.0, p);
        // Purely radial: output stays on the same ray
        assert!((out.normalize() - p.normalize()).length() < 1e-6);
        // b > 0 shrinks the polynomial inside the unit circle, pushing points out
        assert!(out.length() > p.length());
    }
}
