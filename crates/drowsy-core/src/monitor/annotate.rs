//! Landmark overlay drawing.

#![allow(clippy::cast_possible_truncation)]

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;

use crate::domain::Landmarks;

/// Marker colour for eye landmarks.
pub const MARKER_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

/// Marker radius in pixels.
pub const MARKER_RADIUS: i32 = 2;

/// Draws a filled dot on each eye landmark (points 36-47).
///
/// Points outside the canvas are clipped.
pub fn draw_eye_markers(canvas: &mut RgbImage, landmarks: &Landmarks) {
    for point in landmarks.eye_markers() {
        if !point.x.is_finite() || !point.y.is_finite() {
            continue;
        }
        let center = (point.x.round() as i32, point.y.round() as i32);
        draw_filled_circle_mut(canvas, center, MARKER_RADIUS, MARKER_COLOR);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::{Point, LANDMARK_COUNT};

    #[test]
    fn test_markers_drawn_on_eye_points_only() {
        let mut points = vec![Point::new(5.0, 5.0); LANDMARK_COUNT];
        for p in &mut points[36..48] {
            *p = Point::new(20.0, 20.0);
        }
        let landmarks = Landmarks::new(points).unwrap();
        let mut canvas = RgbImage::new(40, 40);

        draw_eye_markers(&mut canvas, &landmarks);

        assert_eq!(*canvas.get_pixel(20, 20), MARKER_COLOR);
        assert_eq!(*canvas.get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_out_of_bounds_markers_are_clipped() {
        let points = vec![Point::new(-50.0, 1000.0); LANDMARK_COUNT];
        let landmarks = Landmarks::new(points).unwrap();
        let mut canvas = RgbImage::new(10, 10);

        draw_eye_markers(&mut canvas, &landmarks);

        assert!(canvas.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }
}
