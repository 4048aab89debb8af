//! Distance helpers for the physical-overlap channel
//!
//! The wave's sampled shape is treated as an open polyline (an edge collider);
//! the player is a circle.

use glam::Vec2;

/// Signed distance to a circle
#[inline]
pub fn sd_circle(p: Vec2, center: Vec2, radius: f32) -> f32 {
    (p - center).length() - radius
}

/// Unsigned distance from `p` to segment `a`-`b`
pub fn sd_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let line = b - a;
    let len_sq = line.length_squared();
    if len_sq < 1e-8 {
        // Degenerate segment
        return (p - a).length();
    }
    let t = ((p - a).dot(line) / len_sq).clamp(0.0, 1.0);
    (p - (a + line * t)).length()
}

/// Unsigned distance from `p` to an open polyline
pub fn sd_polyline(p: Vec2, points: &[Vec2]) -> f32 {
    match points {
        [] => f32::MAX,
        [single] => (p - *single).length(),
        _ => points
            .windows(2)
            .map(|w| sd_segment(p, w[0], w[1]))
            .fold(f32::MAX, f32::min),
    }
}

/// Whether a circle touches the polyline
#[inline]
pub fn circle_overlaps_polyline(center: Vec2, radius: f32, points: &[Vec2]) -> bool {
    sd_polyline(center, points) < radius
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sd_circle() {
        assert!((sd_circle(Vec2::new(10.0, 0.0), Vec2::ZERO, 4.0) - 6.0).abs() < 1e-5);
        assert!(sd_circle(Vec2::new(1.0, 0.0), Vec2::ZERO, 4.0) < 0.0);
    }

    #[test]
    fn test_sd_segment_interior_and_caps() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, 0.0);
        assert!((sd_segment(Vec2::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-5);
        assert!((sd_segment(Vec2::new(13.0, 4.0), a, b) - 5.0).abs() < 1e-5);
        assert!((sd_segment(Vec2::new(3.0, 4.0), a, a) - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_polyline_overlap() {
        let pts = [Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0)];
        assert!(circle_overlaps_polyline(Vec2::new(12.0, 5.0), 3.0, &pts));
        assert!(!circle_overlaps_polyline(Vec2::new(5.0, 5.0), 3.0, &pts));
        assert!(!circle_overlaps_polyline(Vec2::ZERO, 3.0, &[]));
    }
}
