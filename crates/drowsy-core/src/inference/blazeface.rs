//! `BlazeFace` face detector.
//!
//! Short-range front-camera variant: 128x128 RGB input, two feature maps
//! (16x16 with 2 anchors per cell, 8x8 with 6) for 896 anchors in total.
//! Weights are the `blazeface.pth` state dict from hollance/BlazeFace-PyTorch:
//! the stem is `backbone1.0`, blocks are `backbone1.2..=12` and
//! `backbone2.0..=4` (each with `convs.0` depthwise and `convs.1` pointwise),
//! and heads are named by anchor stride (`*_8` on the 16x16 map, `*_16` on
//! the 8x8 map).

// Allow common ML code patterns
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

use anyhow::{Context, Result};
use candle_core::{Device, Module, Tensor};
use candle_nn::{conv2d, Conv2d, Conv2dConfig, VarBuilder};
use image::DynamicImage;

use crate::domain::{BoundingBox, FaceRegion};
use crate::ports::FaceDetector;

/// Input image size for `BlazeFace`.
pub const INPUT_SIZE: usize = 128;

/// Anchors on the 16x16 map.
const ANCHORS_16: usize = 16 * 16 * 2;
/// Anchors on the 8x8 map.
const ANCHORS_8: usize = 8 * 8 * 6;
/// Values regressed per anchor: box (4) + six keypoints (12).
const REGRESSION_VALUES: usize = 16;

/// `(in, out, stride)` for the blocks feeding the 16x16 head.
const BACKBONE_16: [(usize, usize, usize); 11] = [
    (24, 24, 1),
    (24, 28, 1),
    (28, 32, 2),
    (32, 36, 1),
    (36, 42, 1),
    (42, 48, 2),
    (48, 56, 1),
    (56, 64, 1),
    (64, 72, 1),
    (72, 80, 1),
    (80, 88, 1),
];

/// `(in, out, stride)` for the blocks feeding the 8x8 head.
const BACKBONE_8: [(usize, usize, usize); 5] = [
    (88, 96, 2),
    (96, 96, 1),
    (96, 96, 1),
    (96, 96, 1),
    (96, 96, 1),
];

/// Detector thresholds.
#[derive(Debug, Clone, Copy)]
pub struct BlazeFaceConfig {
    /// Minimum sigmoid score for a candidate.
    pub score_threshold: f32,
    /// Overlap above which a weaker candidate is suppressed.
    pub nms_threshold: f32,
}

impl Default for BlazeFaceConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.75,
            nms_threshold: 0.3,
        }
    }
}

/// A decoded candidate in normalized `[x_min, y_min, x_max, y_max]` coordinates.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    bbox: [f32; 4],
    score: f32,
}

/// Depthwise-separable residual block.
struct BlazeBlock {
    depthwise: Conv2d,
    pointwise: Conv2d,
    channel_pad: usize,
    downsample: bool,
}

impl BlazeBlock {
    fn load(in_c: usize, out_c: usize, stride: usize, vb: &VarBuilder) -> Result<Self> {
        let downsample = stride == 2;
        let depthwise = conv2d(
            in_c,
            in_c,
            3,
            Conv2dConfig {
                stride,
                padding: usize::from(!downsample),
                groups: in_c,
                ..Conv2dConfig::default()
            },
            vb.pp("convs.0"),
        )?;
        let pointwise = conv2d(in_c, out_c, 1, Conv2dConfig::default(), vb.pp("convs.1"))?;

        Ok(Self {
            depthwise,
            pointwise,
            channel_pad: out_c.saturating_sub(in_c),
            downsample,
        })
    }
}

impl Module for BlazeBlock {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let (branch_in, shortcut) = if self.downsample {
            // "same" padding for a stride-2 3x3 kernel is (0, 2) on each axis
            let padded = x.pad_with_zeros(2, 0, 2)?.pad_with_zeros(3, 0, 2)?;
            (padded, x.max_pool2d(2)?)
        } else {
            (x.clone(), x.clone())
        };

        let branch = self.depthwise.forward(&branch_in)?.relu()?;
        let branch = self.pointwise.forward(&branch)?;

        let shortcut = if self.channel_pad > 0 {
            shortcut.pad_with_zeros(1, 0, self.channel_pad)?
        } else {
            shortcut
        };

        (branch + shortcut)?.relu()
    }
}

/// Classifier and regressor heads for one feature map.
struct Head {
    classifier: Conv2d,
    regressor: Conv2d,
    anchors: usize,
}

impl Head {
    fn load(
        channels: usize,
        per_cell: usize,
        anchors: usize,
        stride: &str,
        vb: &VarBuilder,
    ) -> Result<Self> {
        Ok(Self {
            classifier: conv2d(
                channels,
                per_cell,
                1,
                Conv2dConfig::default(),
                vb.pp(format!("classifier_{stride}")),
            )?,
            regressor: conv2d(
                channels,
                per_cell * REGRESSION_VALUES,
                1,
                Conv2dConfig::default(),
                vb.pp(format!("regressor_{stride}")),
            )?,
            anchors,
        })
    }

    /// Returns `(scores (1, n, 1), regressions (1, n, 16))` in NHWC anchor order.
    fn forward(&self, features: &Tensor) -> candle_core::Result<(Tensor, Tensor)> {
        let scores = self
            .classifier
            .forward(features)?
            .permute((0, 2, 3, 1))?
            .reshape((1, self.anchors, 1))?;
        let boxes = self
            .regressor
            .forward(features)?
            .permute((0, 2, 3, 1))?
            .reshape((1, self.anchors, REGRESSION_VALUES))?;
        Ok((scores, boxes))
    }
}

/// `BlazeFace` face detection model.
pub struct BlazeFace {
    stem: Conv2d,
    backbone_16: Vec<BlazeBlock>,
    backbone_8: Vec<BlazeBlock>,
    head_16: Head,
    head_8: Head,
    anchors: Vec<[f32; 2]>,
    config: BlazeFaceConfig,
    device: Device,
}

impl BlazeFace {
    /// Builds the model from weights with default thresholds.
    ///
    /// # Errors
    ///
    /// Returns an error if model weights cannot be loaded or are invalid.
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(vb: VarBuilder) -> Result<Self> {
        Self::with_config(vb, BlazeFaceConfig::default())
    }

    /// Builds the model from weights with custom thresholds.
    ///
    /// # Errors
    ///
    /// Returns an error if model weights cannot be loaded or are invalid.
    #[allow(clippy::needless_pass_by_value)]
    pub fn with_config(vb: VarBuilder, config: BlazeFaceConfig) -> Result<Self> {
        let device = vb.device().clone();

        let stem = conv2d(
            3,
            24,
            5,
            Conv2dConfig {
                stride: 2,
                ..Conv2dConfig::default()
            },
            vb.pp("backbone1.0"),
        )?;

        let backbone_16 = BACKBONE_16
            .iter()
            .enumerate()
            .map(|(i, &(in_c, out_c, s))| {
                // backbone1.1 is the stem's ReLU
                BlazeBlock::load(in_c, out_c, s, &vb.pp(format!("backbone1.{}", i + 2)))
            })
            .collect::<Result<Vec<_>>>()
            .context("Failed to load 16x16 backbone")?;

        let backbone_8 = BACKBONE_8
            .iter()
            .enumerate()
            .map(|(i, &(in_c, out_c, s))| {
                BlazeBlock::load(in_c, out_c, s, &vb.pp(format!("backbone2.{i}")))
            })
            .collect::<Result<Vec<_>>>()
            .context("Failed to load 8x8 backbone")?;

        Ok(Self {
            stem,
            backbone_16,
            backbone_8,
            head_16: Head::load(88, 2, ANCHORS_16, "8", &vb)?,
            head_8: Head::load(96, 6, ANCHORS_8, "16", &vb)?,
            anchors: anchor_centers(),
            config,
            device,
        })
    }

    /// Converts an image into a `(1, 3, 128, 128)` tensor in `[-1, 1]`.
    fn preprocess(&self, image: &DynamicImage) -> Result<Tensor> {
        let rgb = image
            .resize_exact(
                INPUT_SIZE as u32,
                INPUT_SIZE as u32,
                image::imageops::FilterType::Triangle,
            )
            .to_rgb8();

        let data: Vec<f32> = rgb
            .into_raw()
            .into_iter()
            .map(|v| f32::from(v) / 127.5 - 1.0)
            .collect();

        Tensor::from_vec(data, (1, INPUT_SIZE, INPUT_SIZE, 3), &self.device)?
            .permute((0, 3, 1, 2))?
            .contiguous()
            .context("Failed to build BlazeFace input")
    }

    fn forward(&self, x: &Tensor) -> candle_core::Result<(Tensor, Tensor)> {
        let x = x.pad_with_zeros(2, 1, 2)?.pad_with_zeros(3, 1, 2)?;
        let mut h = self.stem.forward(&x)?.relu()?;

        for block in &self.backbone_16 {
            h = block.forward(&h)?;
        }
        let (scores_16, boxes_16) = self.head_16.forward(&h)?;

        for block in &self.backbone_8 {
            h = block.forward(&h)?;
        }
        let (scores_8, boxes_8) = self.head_8.forward(&h)?;

        Ok((
            Tensor::cat(&[scores_16, scores_8], 1)?,
            Tensor::cat(&[boxes_16, boxes_8], 1)?,
        ))
    }

    /// Detects faces, returning normalized candidates after suppression.
    fn candidates(&self, image: &DynamicImage) -> Result<Vec<Candidate>> {
        let input = self.preprocess(image)?;
        let (scores, boxes) = self.forward(&input).context("BlazeFace forward pass failed")?;

        let scores = scores.squeeze(0)?.squeeze(1)?.to_vec1::<f32>()?;
        let boxes = boxes.squeeze(0)?.to_vec2::<f32>()?;

        let size = INPUT_SIZE as f32;
        let found = self
            .anchors
            .iter()
            .zip(scores.iter().zip(&boxes))
            .filter_map(|(&[ax, ay], (&logit, regression))| {
                let score = sigmoid(logit);
                if score < self.config.score_threshold {
                    return None;
                }
                let cx = ax + regression[0] / size;
                let cy = ay + regression[1] / size;
                let half_w = regression[2] / size / 2.0;
                let half_h = regression[3] / size / 2.0;
                Some(Candidate {
                    bbox: [
                        (cx - half_w).clamp(0.0, 1.0),
                        (cy - half_h).clamp(0.0, 1.0),
                        (cx + half_w).clamp(0.0, 1.0),
                        (cy + half_h).clamp(0.0, 1.0),
                    ],
                    score,
                })
            })
            .collect();

        Ok(suppress(found, self.config.nms_threshold))
    }
}

impl FaceDetector for BlazeFace {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<FaceRegion>> {
        let (w, h) = (image.width() as f32, image.height() as f32);

        Ok(self
            .candidates(image)?
            .into_iter()
            .map(|c| to_region(&c, w, h))
            .filter(|r| !r.bbox.is_empty())
            .collect())
    }
}

/// Anchor centres for both feature maps, in network output order.
fn anchor_centers() -> Vec<[f32; 2]> {
    let mut anchors = Vec::with_capacity(ANCHORS_16 + ANCHORS_8);
    for (grid, per_cell) in [(16_u8, 2), (8_u8, 6)] {
        let cells = f32::from(grid);
        for y in 0..grid {
            for x in 0..grid {
                let center = [
                    (f32::from(x) + 0.5) / cells,
                    (f32::from(y) + 0.5) / cells,
                ];
                anchors.extend(std::iter::repeat(center).take(per_cell));
            }
        }
    }
    anchors
}

/// Greedy non-maximum suppression, strongest first.
fn suppress(mut candidates: Vec<Candidate>, threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept.iter().all(|k| iou(&k.bbox, &candidate.bbox) < threshold) {
            kept.push(candidate);
        }
    }
    kept
}

/// Intersection over Union for two `[x_min, y_min, x_max, y_max]` boxes.
fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let inter_w = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let inter_h = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let intersection = inter_w * inter_h;

    let union = (a[2] - a[0]) * (a[3] - a[1]) + (b[2] - b[0]) * (b[3] - b[1]) - intersection;
    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Scales a normalized candidate to a pixel-space face region.
fn to_region(candidate: &Candidate, width: f32, height: f32) -> FaceRegion {
    let [x0, y0, x1, y1] = candidate.bbox;
    FaceRegion {
        bbox: BoundingBox::new(
            (x0 * width) as u32,
            (y0 * height) as u32,
            ((x1 - x0) * width) as u32,
            ((y1 - y0) * height) as u32,
        ),
        confidence: candidate.score,
    }
}

/// Converts a classifier logit into a face score.
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
