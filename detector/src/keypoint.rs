//! Built-in Harris corner detector with patch descriptors.
//!
//! Pipeline: decode, grayscale, Gaussian blur, Sobel gradients, Harris
//! response over a 3x3 window, non-maximum suppression, relative threshold,
//! then a normalised 8x8 intensity descriptor sampled from the 16x16 patch
//! around each keypoint.

use std::fmt::Display;
use std::io::Cursor;

use image::{imageops, DynamicImage, GrayImage, ImageReader, Limits, Luma};
use serde::{Deserialize, Serialize};

use common::DetectedFeatures;

use crate::error::{DetectorError, DetectorResult};
use crate::traits::FeatureDetector;

const HARRIS_K: f32 = 0.04;
/// Half the side of the descriptor patch
const PATCH_RADIUS: usize = 8;
const PATCH_STEP: usize = 2;
const SAMPLES_PER_SIDE: usize = 2 * PATCH_RADIUS / PATCH_STEP;
pub const DESCRIPTOR_LEN: usize = SAMPLES_PER_SIDE * SAMPLES_PER_SIDE;

const WARMUP_SIZE: u32 = 64;
const WARMUP_CELL: u32 = 8;
/// Widest decoded pixel format (RGBA f32)
const MAX_BYTES_PER_PIXEL: u64 = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Upper bound on reported keypoints, strongest kept
    pub max_features: usize,
    /// Gaussian blur applied before detection; 0 disables it
    pub blur_sigma: f32,
    /// Minimum corner response as a fraction of the strongest response
    pub response_threshold: f32,
    /// Largest accepted `width * height`; bigger images are rejected before decoding
    pub max_pixels: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_features: 500,
            blur_sigma: 1.0,
            response_threshold: 0.01,
            max_pixels: 24_000_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: u32,
    pub y: u32,
    pub response: f32,
}

/// Full detector output, before it is reduced to [`DetectedFeatures`].
#[derive(Debug, Clone)]
pub struct Detection {
    pub width: u32,
    pub height: u32,
    pub keypoints: Vec<Keypoint>,
    /// One descriptor per keypoint, same order
    pub descriptors: Vec<[f32; DESCRIPTOR_LEN]>,
}

impl Detection {
    pub fn summary(&self) -> DetectedFeatures {
        let rows = self.descriptors.len();
        DetectedFeatures {
            width: self.width,
            height: self.height,
            keypoints: self.keypoints.len(),
            descriptors: if rows == 0 { [0, 0] } else { [rows, DESCRIPTOR_LEN] },
        }
    }
}

/// Stateless, so safe to call from many threads at once.
#[derive(Debug, Clone, Default)]
pub struct KeypointDetector {
    config: DetectorConfig,
}

impl KeypointDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Decode `bytes` and run the full pipeline.
    pub fn detect_image(&self, bytes: &[u8]) -> DetectorResult<Detection> {
        let decoded = self.decode(bytes)?;
        Ok(self.detect_gray(&decoded.to_luma8()))
    }

    /// Read the header first so oversized images never reach the decoder.
    fn decode(&self, bytes: &[u8]) -> DetectorResult<DynamicImage> {
        let (width, height) = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(invalid_image)?
            .into_dimensions()
            .map_err(invalid_image)?;

        let pixels = u64::from(width) * u64::from(height);
        if pixels > self.config.max_pixels {
            return Err(DetectorError::InvalidImage(format!(
                "image is {}x{} ({} pixels), limit is {} pixels",
                width, height, pixels, self.config.max_pixels
            )));
        }

        let mut limits = Limits::default();
        limits.max_image_width = Some(width);
        limits.max_image_height = Some(height);
        limits.max_alloc = Some(pixels.saturating_mul(MAX_BYTES_PER_PIXEL));

        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(invalid_image)?;
        reader.limits(limits);
        reader.decode().map_err(invalid_image)
    }

    pub fn detect_gray(&self, gray: &GrayImage) -> Detection {
        let (width, height) = gray.dimensions();
        let smoothed = if self.config.blur_sigma > 0.0 {
            imageops::blur(gray, self.config.blur_sigma)
        } else {
            gray.clone()
        };

        let pixels: Vec<f32> = smoothed.as_raw().iter().map(|&p| p as f32 / 255.0).collect();
        let (w, h) = (width as usize, height as usize);

        let response = harris_response(&pixels, w, h);
        let keypoints = select_keypoints(
            &response,
            w,
            h,
            self.config.response_threshold,
            self.config.max_features,
        );
        let descriptors = keypoints.iter().map(|kp| describe(&pixels, w, kp)).collect();

        Detection {
            width,
            height,
            keypoints,
            descriptors,
        }
    }
}

impl FeatureDetector for KeypointDetector {
    fn warmup(&self) -> DetectorResult<()> {
        let detection = self.detect_gray(&checkerboard(WARMUP_SIZE, WARMUP_CELL));
        if detection.keypoints.is_empty() {
            return Err(DetectorError::Warmup(
                "no keypoints found on calibration pattern".into(),
            ));
        }
        tracing::debug!(
            keypoints = detection.keypoints.len(),
            "Calibration pattern detected"
        );
        Ok(())
    }

    fn detect(&self, image: &[u8]) -> DetectorResult<DetectedFeatures> {
        Ok(self.detect_image(image)?.summary())
    }

    fn concurrent_safe(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "harris-keypoint"
    }
}

fn invalid_image(err: impl Display) -> DetectorError {
    DetectorError::InvalidImage(err.to_string())
}

/// Black and white squares of `cell` pixels.
pub fn checkerboard(size: u32, cell: u32) -> GrayImage {
    GrayImage::from_fn(size, size, |x, y| {
        let dark = ((x / cell) + (y / cell)) % 2 == 0;
        Luma([if dark { 0 } else { 255 }])
    })
}

fn harris_response(px: &[f32], w: usize, h: usize) -> Vec<f32> {
    let mut response = vec![0.0f32; w * h];
    if w < 5 || h < 5 {
        return response;
    }

    let at = |x: usize, y: usize| px[y * w + x];
    let mut ixx = vec![0.0f32; w * h];
    let mut iyy = vec![0.0f32; w * h];
    let mut ixy = vec![0.0f32; w * h];

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let gx = (at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x - 1, y) + at(x - 1, y + 1));
            let gy = (at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x, y - 1) + at(x + 1, y - 1));
            let i = y * w + x;
            ixx[i] = gx * gx;
            iyy[i] = gy * gy;
            ixy[i] = gx * gy;
        }
    }

    for y in 2..h - 2 {
        for x in 2..w - 2 {
            let (mut sxx, mut syy, mut sxy) = (0.0f32, 0.0f32, 0.0f32);
            for ny in y - 1..=y + 1 {
                for nx in x - 1..=x + 1 {
                    let i = ny * w + nx;
                    sxx += ixx[i];
                    syy += iyy[i];
                    sxy += ixy[i];
                }
            }
            let det = sxx * syy - sxy * sxy;
            let trace = sxx + syy;
            response[y * w + x] = det - HARRIS_K * trace * trace;
        }
    }

    response
}

/// Local maxima above the relative threshold whose descriptor patch fits in
/// the image, strongest first.
fn select_keypoints(
    response: &[f32],
    w: usize,
    h: usize,
    relative_threshold: f32,
    max_features: usize,
) -> Vec<Keypoint> {
    let strongest = response.iter().copied().fold(0.0f32, f32::max);
    if strongest <= 0.0 || max_features == 0 || w < 2 * PATCH_RADIUS || h < 2 * PATCH_RADIUS {
        return Vec::new();
    }
    let threshold = strongest * relative_threshold;

    let mut found = Vec::new();
    for y in PATCH_RADIUS..=h - PATCH_RADIUS {
        for x in PATCH_RADIUS..=w - PATCH_RADIUS {
            let value = response[y * w + x];
            if value > threshold && is_local_max(response, w, x, y, value) {
                found.push(Keypoint {
                    x: x as u32,
                    y: y as u32,
                    response: value,
                });
            }
        }
    }

    found.sort_by(|a, b| b.response.total_cmp(&a.response));
    found.truncate(max_features);
    found
}

/// 3x3 suppression. On a plateau only the first pixel in raster order wins.
fn is_local_max(response: &[f32], w: usize, x: usize, y: usize, value: f32) -> bool {
    for ny in y - 1..=y + 1 {
        for nx in x - 1..=x + 1 {
            if (ny, nx) == (y, x) {
                continue;
            }
            let neighbour = response[ny * w + nx];
            let earlier = (ny, nx) < (y, x);
            if neighbour > value || (earlier && neighbour == value) {
                return false;
            }
        }
    }
    true
}

fn describe(px: &[f32], w: usize, kp: &Keypoint) -> [f32; DESCRIPTOR_LEN] {
    let x0 = kp.x as usize - PATCH_RADIUS;
    let y0 = kp.y as usize - PATCH_RADIUS;

    let mut descriptor = [0.0f32; DESCRIPTOR_LEN];
    for (i, slot) in descriptor.iter_mut().enumerate() {
        let row = i / SAMPLES_PER_SIDE;
        let col = i % SAMPLES_PER_SIDE;
        *slot = px[(y0 + row * PATCH_STEP) * w + x0 + col * PATCH_STEP];
    }

    let mean = descriptor.iter().sum::<f32>() / DESCRIPTOR_LEN as f32;
    descriptor.iter_mut().for_each(|v| *v -= mean);
    let norm = descriptor.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        descriptor.iter_mut().for_each(|v| *v /= norm);
    }
    descriptor
}
