//! OpenCV capture and preview window.

use anyhow::{bail, Context, Result};
use drowsy_core::{Frame, FrameDisplay, FrameSource, KeyAction};
use image::{DynamicImage, RgbImage};
use opencv::core::{Mat, Scalar, CV_8UC3};
use opencv::highgui;
use opencv::imgproc;
use opencv::prelude::*;
use opencv::videoio::{VideoCapture, CAP_ANY, CAP_PROP_FRAME_COUNT};
use tracing::{debug, info, warn};

/// Title of the preview window.
pub const WINDOW_TITLE: &str = "Driver Monitoring System";

/// Frame source backed by an OpenCV `VideoCapture` (camera or video file).
pub struct CameraSource {
    capture: VideoCapture,
    label: String,
    frames: Option<u64>,
    next: u64,
}

impl CameraSource {
    /// Opens a camera by device index.
    ///
    /// # Errors
    ///
    /// Returns an error if the camera cannot be opened.
    pub fn open_camera(index: u32) -> Result<Self> {
        let device = i32::try_from(index).context("Camera index out of range")?;
        let capture = VideoCapture::new(device, CAP_ANY)
            .with_context(|| format!("Failed to open camera {index}"))?;
        Self::from_capture(capture, format!("camera:{index}"), false)
    }

    /// Opens a video file for replay.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or decoded.
    pub fn open_video(path: &str) -> Result<Self> {
        let capture = VideoCapture::from_file(path, CAP_ANY)
            .with_context(|| format!("Failed to open video {path}"))?;
        Self::from_capture(capture, path.to_string(), true)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn from_capture(capture: VideoCapture, label: String, finite: bool) -> Result<Self> {
        if !capture.is_opened()? {
            bail!("Capture device {label} cannot be opened");
        }

        let frames = if finite {
            capture
                .get(CAP_PROP_FRAME_COUNT)
                .ok()
                .filter(|n| *n > 0.0)
                .map(|n| n as u64)
        } else {
            None
        };

        info!("Opened {label} (frames: {frames:?})");
        Ok(Self {
            capture,
            label,
            frames,
            next: 0,
        })
    }
}

impl FrameSource for CameraSource {
    fn read(&mut self) -> Result<Option<Frame>> {
        let mut mat = Mat::default();
        let grabbed = self
            .capture
            .read(&mut mat)
            .with_context(|| format!("Failed to read from {}", self.label))?;
        if !grabbed || mat.empty() {
            return Ok(None);
        }

        self.next += 1;
        let image = mat_to_rgb(&mat)?;
        Ok(Some(Frame::new(
            self.next,
            self.label.clone(),
            DynamicImage::ImageRgb8(image),
        )))
    }

    fn len_hint(&self) -> Option<u64> {
        self.frames
    }

    fn release(&mut self) {
        debug!("Releasing {}", self.label);
        if let Err(e) = self.capture.release() {
            warn!("Failed to release {}: {e}", self.label);
        }
    }
}

/// Preview window showing annotated frames; `q` requests quit.
pub struct WindowDisplay {
    title: String,
}

impl WindowDisplay {
    /// Opens the preview window.
    ///
    /// # Errors
    ///
    /// Returns an error if no window can be created (e.g. no display server).
    pub fn open() -> Result<Self> {
        highgui::named_window(WINDOW_TITLE, highgui::WINDOW_AUTOSIZE)
            .context("Failed to open preview window")?;
        Ok(Self {
            title: WINDOW_TITLE.to_string(),
        })
    }
}

impl FrameDisplay for WindowDisplay {
    fn show(&mut self, _index: u64, frame: &RgbImage) -> Result<KeyAction> {
        let mat = rgb_to_mat(frame)?;
        highgui::imshow(&self.title, &mat).context("Failed to show frame")?;

        let key = highgui::wait_key(1).context("Failed to poll keyboard")?;
        if key & 0xFF == i32::from(b'q') {
            Ok(KeyAction::Quit)
        } else {
            Ok(KeyAction::Continue)
        }
    }
}

impl Drop for WindowDisplay {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_window(&self.title) {
            debug!("Failed to close window: {e}");
        }
    }
}

/// Converts a BGR, BGRA or grayscale 8-bit `Mat` into an RGB image.
#[allow(clippy::cast_sign_loss)]
fn mat_to_rgb(mat: &Mat) -> Result<RgbImage> {
    let code = match mat.channels() {
        1 => imgproc::COLOR_GRAY2RGB,
        3 => imgproc::COLOR_BGR2RGB,
        4 => imgproc::COLOR_BGRA2RGB,
        n => bail!("Unsupported frame with {n} channels"),
    };

    let mut rgb = Mat::default();
    imgproc::cvt_color(mat, &mut rgb, code, 0).context("Colour conversion failed")?;
    let rgb = if rgb.is_continuous() {
        rgb
    } else {
        rgb.try_clone()?
    };

    let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
    let bytes = rgb.data_bytes().context("Failed to access frame data")?.to_vec();
    RgbImage::from_raw(width, height, bytes)
        .with_context(|| format!("Frame buffer does not match {width}x{height}"))
}

/// Converts an RGB image into a BGR `Mat`.
pub(crate) fn rgb_to_mat(image: &RgbImage) -> Result<Mat> {
    let rows = i32::try_from(image.height()).context("Frame too tall")?;
    let cols = i32::try_from(image.width()).context("Frame too wide")?;

    let mut mat = Mat::new_rows_cols_with_default(rows, cols, CV_8UC3, Scalar::all(0.0))?;
    let dst = mat.data_bytes_mut()?;
    for (bgr, rgb) in dst.chunks_exact_mut(3).zip(image.as_raw().chunks_exact(3)) {
        bgr[0] = rgb[2];
        bgr[1] = rgb[1];
        bgr[2] = rgb[0];
    }
    Ok(mat)
}
