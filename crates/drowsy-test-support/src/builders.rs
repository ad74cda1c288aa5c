//! Landmark and frame builders for testing.

use image::{DynamicImage, Rgb, RgbImage};

use drowsy_core::domain::{Frame, Landmarks, Point, LANDMARK_COUNT, LEFT_EYE, RIGHT_EYE};

/// Eye width in the builder's unit face.
const EYE_WIDTH: f32 = 30.0;

/// Builder for 68-point landmark sets with a chosen eye aspect ratio.
///
/// Eyes are laid out so that both vertical lid distances equal
/// `ear * width`, which makes the computed EAR exactly the requested value.
#[derive(Debug, Clone)]
pub struct LandmarkBuilder {
    left_ear: f32,
    right_ear: f32,
    origin: Point,
    scale: f32,
    coincident_corners: bool,
    nan_lid: bool,
}

impl Default for LandmarkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LandmarkBuilder {
    /// An open-eyed face (EAR 0.30) anchored at the origin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            left_ear: 0.30,
            right_ear: 0.30,
            origin: Point::new(0.0, 0.0),
            scale: 1.0,
            coincident_corners: false,
            nan_lid: false,
        }
    }

    /// Sets the same EAR on both eyes.
    #[must_use]
    pub fn with_ear(self, ear: f32) -> Self {
        self.with_eyes(ear, ear)
    }

    /// Sets each eye's EAR separately.
    #[must_use]
    pub fn with_eyes(mut self, left: f32, right: f32) -> Self {
        self.left_ear = left;
        self.right_ear = right;
        self
    }

    /// Moves the face so its top-left landmark bound sits at `(x, y)`.
    #[must_use]
    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.origin = Point::new(x, y);
        self
    }

    /// Scales the face about its origin.
    #[must_use]
    pub fn scaled(mut self, k: f32) -> Self {
        self.scale = k;
        self
    }

    /// Collapses the left eye's corners onto one point.
    #[must_use]
    pub fn with_degenerate_eye(mut self) -> Self {
        self.coincident_corners = true;
        self
    }

    /// Replaces the left eye's first upper-lid point with NaN.
    #[must_use]
    pub fn with_nan_lid(mut self) -> Self {
        self.nan_lid = true;
        self
    }

    /// Builds the raw point list.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn points(&self) -> Vec<Point> {
        // Face outline and other features on a loose oval; only the eyes matter.
        let mut points: Vec<Point> = (0..LANDMARK_COUNT)
            .map(|i| {
                let t = i as f32 / LANDMARK_COUNT as f32 * std::f32::consts::TAU;
                Point::new(50.0 + 45.0 * t.cos(), 55.0 + 50.0 * t.sin())
            })
            .collect();

        let left = eye(Point::new(20.0, 40.0), self.left_ear);
        let right = eye(Point::new(55.0, 40.0), self.right_ear);
        points[LEFT_EYE].copy_from_slice(&left);
        points[RIGHT_EYE].copy_from_slice(&right);

        if self.coincident_corners {
            points[LEFT_EYE.start + 3] = points[LEFT_EYE.start];
        }
        if self.nan_lid {
            points[LEFT_EYE.start + 1].x = f32::NAN;
        }

        points
            .into_iter()
            .map(|p| {
                Point::new(
                    self.origin.x + p.x * self.scale,
                    self.origin.y + p.y * self.scale,
                )
            })
            .collect()
    }

    /// Builds the landmark set.
    ///
    /// # Panics
    ///
    /// Never: the builder always produces 68 points.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn build(&self) -> Landmarks {
        Landmarks::new(self.points()).expect("builder produces 68 points")
    }
}

/// Six eye points starting at `corner` with lid distances of `ear * width`.
fn eye(corner: Point, ear: f32) -> [Point; 6] {
    let half = ear * EYE_WIDTH / 2.0;
    let third = EYE_WIDTH / 3.0;
    let (x, y) = (corner.x, corner.y);
    [
        Point::new(x, y),
        Point::new(x + third, y - half),
        Point::new(x + 2.0 * third, y - half),
        Point::new(x + EYE_WIDTH, y),
        Point::new(x + 2.0 * third, y + half),
        Point::new(x + third, y + half),
    ]
}

/// Builder for synthetic frames.
pub struct SyntheticFrameBuilder;

impl SyntheticFrameBuilder {
    /// A black RGB frame.
    #[must_use]
    pub fn blank(index: u64, width: u32, height: u32) -> Frame {
        Self::uniform(index, width, height, [0, 0, 0])
    }

    /// A single-colour RGB frame.
    #[must_use]
    pub fn uniform(index: u64, width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let img = RgbImage::from_pixel(width, height, Rgb(rgb));
        Frame::new(
            index,
            format!("synthetic://frame/{index}"),
            DynamicImage::ImageRgb8(img),
        )
    }

    /// A frame with a horizontal gradient, so annotated pixels stand out.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn gradient(index: u64, width: u32, height: u32) -> Frame {
        let img = RgbImage::from_fn(width, height, |x, _| {
            let v = ((u32::from(u8::MAX) * x) / width.max(1)) as u8;
            Rgb([v, v, v])
        });
        Frame::new(
            index,
            format!("synthetic://gradient/{index}"),
            DynamicImage::ImageRgb8(img),
        )
    }

    /// `count` blank frames numbered from 1.
    #[must_use]
    pub fn sequence(count: u64, width: u32, height: u32) -> Vec<Frame> {
        (1..=count).map(|i| Self::blank(i, width, height)).collect()
    }
}
