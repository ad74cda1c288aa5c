//! Face detection and landmark prediction ports.

use image::DynamicImage;

use crate::domain::{FaceRegion, Landmarks};

/// Port for locating faces in an image.
pub trait FaceDetector: Send + Sync {
    /// Returns the faces found in `image`, in pixel coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    fn detect(&self, image: &DynamicImage) -> anyhow::Result<Vec<FaceRegion>>;
}

/// Port for predicting the 68 facial landmarks of a detected face.
pub trait LandmarkPredictor: Send + Sync {
    /// Predicts landmarks for `region` of `image`, in pixel coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails or the model yields the wrong
    /// number of points.
    fn predict(&self, image: &DynamicImage, region: &FaceRegion) -> anyhow::Result<Landmarks>;
}
