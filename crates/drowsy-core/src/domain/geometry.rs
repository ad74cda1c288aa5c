//! Face geometry: points, bounding boxes and the 68-point landmark layout.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::DrowsinessError;

/// Number of points in the iBUG 300-W landmark layout.
pub const LANDMARK_COUNT: usize = 68;

/// Landmark indices of the subject's left eye (image right for a frontal face).
pub const LEFT_EYE: Range<usize> = 36..42;

/// Landmark indices of the subject's right eye.
pub const RIGHT_EYE: Range<usize> = 42..48;

/// Landmark indices drawn as markers on annotated frames.
pub const EYE_MARKERS: Range<usize> = 36..48;

/// A 2-D point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl Point {
    /// Creates a point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Returns this point scaled by `k` about the origin.
    #[must_use]
    pub fn scaled(self, k: f32) -> Self {
        Self::new(self.x * k, self.y * k)
    }
}

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl BoundingBox {
    /// Creates a bounding box.
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns true if the box has no area.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A face found by a detector in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceRegion {
    /// Face bounding box.
    pub bbox: BoundingBox,
    /// Detector confidence (0.0 to 1.0).
    pub confidence: f32,
}

impl FaceRegion {
    /// Creates a face region with full confidence.
    #[must_use]
    pub const fn new(bbox: BoundingBox) -> Self {
        Self {
            bbox,
            confidence: 1.0,
        }
    }
}

/// The six points outlining one eye.
///
/// Order: outer corner, two upper-lid points, inner corner, two lower-lid points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeShape(pub [Point; 6]);

impl EyeShape {
    /// Returns the eye scaled by `k` about the origin.
    #[must_use]
    pub fn scaled(&self, k: f32) -> Self {
        Self(self.0.map(|p| p.scaled(k)))
    }
}

/// The 68 facial landmarks of one face.
#[derive(Debug, Clone, PartialEq)]
pub struct Landmarks {
    points: Vec<Point>,
}

impl Landmarks {
    /// Wraps a set of landmark points.
    ///
    /// # Errors
    ///
    /// Returns [`DrowsinessError::LandmarkCount`] unless exactly 68 points are supplied.
    pub fn new(points: Vec<Point>) -> Result<Self, DrowsinessError> {
        if points.len() == LANDMARK_COUNT {
            Ok(Self { points })
        } else {
            Err(DrowsinessError::LandmarkCount {
                expected: LANDMARK_COUNT,
                actual: points.len(),
            })
        }
    }

    /// All 68 points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Subject's left eye (indices 36-41).
    #[must_use]
    pub fn left_eye(&self) -> EyeShape {
        self.eye(LEFT_EYE.start)
    }

    /// Subject's right eye (indices 42-47).
    #[must_use]
    pub fn right_eye(&self) -> EyeShape {
        self.eye(RIGHT_EYE.start)
    }

    fn eye(&self, start: usize) -> EyeShape {
        let mut eye = [Point::default(); 6];
        eye.copy_from_slice(&self.points[start..start + 6]);
        EyeShape(eye)
    }

    /// Points drawn on annotated frames.
    #[must_use]
    pub fn eye_markers(&self) -> &[Point] {
        &self.points[EYE_MARKERS]
    }
}
