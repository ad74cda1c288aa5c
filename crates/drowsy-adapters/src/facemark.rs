//! 68-point landmark prediction with OpenCV's LBF facemark.
//!
//! Loads `lbfmodel.yaml` and fits it inside each detector box. Points come
//! back in the iBUG 300-W layout, eyes at 36-41 and 42-47.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use anyhow::{bail, Context, Result};
use drowsy_core::domain::{FaceRegion, Landmarks, Point};
use drowsy_core::LandmarkPredictor;
use image::DynamicImage;
use opencv::core::{Point2f, Ptr, Rect, Vector};
use opencv::face::{create_facemark_lbf, Facemark};
use opencv::prelude::*;
use tracing::info;

use crate::camera::rgb_to_mat;

/// Landmark predictor backed by an LBF facemark model.
pub struct FacemarkPredictor {
    model: Mutex<Ptr<Facemark>>,
}

impl FacemarkPredictor {
    /// Loads an LBF model file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or OpenCV rejects it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("Landmark model not found: {}", path.display());
        }
        let name = path
            .to_str()
            .with_context(|| format!("Non UTF-8 model path: {}", path.display()))?;

        let mut model = create_facemark_lbf().context("Failed to create LBF facemark")?;
        model
            .load_model(name)
            .with_context(|| format!("Invalid landmark model {}", path.display()))?;
        info!("Loaded model {}", path.display());

        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

impl LandmarkPredictor for FacemarkPredictor {
    fn predict(&self, image: &DynamicImage, region: &FaceRegion) -> Result<Landmarks> {
        let mat = rgb_to_mat(&image.to_rgb8())?;
        let faces = Vector::<Rect>::from_iter([face_rect(region)?]);
        let mut fitted = Vector::<Vector<Point2f>>::new();

        let found = self
            .model
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fit(&mat, &faces, &mut fitted)
            .context("Landmark fitting failed")?;
        if !found || fitted.is_empty() {
            bail!("No landmarks fitted for face at {:?}", region.bbox);
        }

        let points = fitted.get(0)?;
        Ok(Landmarks::new(to_points(&points))?)
    }
}

/// The detector box as an OpenCV rectangle.
fn face_rect(region: &FaceRegion) -> Result<Rect> {
    let b = region.bbox;
    Ok(Rect::new(
        i32::try_from(b.x).context("Face box out of range")?,
        i32::try_from(b.y).context("Face box out of range")?,
        i32::try_from(b.width).context("Face box out of range")?,
        i32::try_from(b.height).context("Face box out of range")?,
    ))
}

fn to_points(fitted: &Vector<Point2f>) -> Vec<Point> {
    fitted.iter().map(|p| Point::new(p.x, p.y)).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use drowsy_core::domain::BoundingBox;

    #[test]
    fn test_face_rect_matches_box() {
        let region = FaceRegion::new(BoundingBox::new(12, 34, 56, 78));
        assert_eq!(face_rect(&region).unwrap(), Rect::new(12, 34, 56, 78));
    }

    #[test]
    fn test_face_rect_rejects_overflow() {
        let region = FaceRegion::new(BoundingBox::new(u32::MAX, 0, 10, 10));
        assert!(face_rect(&region).is_err());
    }

    #[test]
    fn test_points_keep_order() {
        let fitted = Vector::<Point2f>::from_iter([Point2f::new(1.0, 2.0), Point2f::new(3.5, 4.5)]);
        assert_eq!(
            to_points(&fitted),
            vec![Point::new(1.0, 2.0), Point::new(3.5, 4.5)]
        );
    }

    #[test]
    fn test_missing_model_file() {
        let err = FacemarkPredictor::load("/nonexistent/lbfmodel.yaml")
            .err()
            .unwrap();
        assert!(err.to_string().contains("not found"));
    }
}
