use arm_link::{ArmSide, Pose6D};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PixelFormat {
    Bgr8,
    Rgb8,
    Gray8,
}

#[derive(Clone, Debug)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub data: Vec<u8>,
    pub ts: Option<OffsetDateTime>,
}

/// Depth image aligned to the color frame, one `u16` millimetre reading per pixel (0 = invalid).
#[derive(Clone, Debug)]
pub struct DepthFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u16>,
    pub ts: Option<OffsetDateTime>,
}

impl DepthFrame {
    pub fn contains(&self, u: i64, v: i64) -> bool {
        u >= 0 && v >= 0 && u < self.width as i64 && v < self.height as i64
    }

    pub fn at(&self, u: u32, v: u32) -> Option<u16> {
        if u >= self.width || v >= self.height {
            return None;
        }
        self.data
            .get(v as usize * self.width as usize + u as usize)
            .copied()
    }
}

#[derive(Clone, Debug)]
pub struct FramePair {
    pub color: Frame,
    pub depth: DepthFrame,
}

/// Axis-aligned box in color-image pixels, corners `(x1, y1)` and `(x2, y2)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Integer center pixel (truncated toward zero).
    pub fn center(&self) -> (i64, i64) {
        (
            ((self.x1 + self.x2) / 2.0) as i64,
            ((self.y1 + self.y2) / 2.0) as i64,
        )
    }
}

/// Raw detector output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub class_label: String,
    pub confidence: f32,
}

/// A detection chosen for grasping, with the depth sampled at its center.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionResult {
    pub bbox: BoundingBox,
    pub class_label: String,
    pub confidence: f32,
    pub depth_mm: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraspRequest {
    pub object_id: String,
    /// Rough target position in the arm's base frame (mm).
    pub approx_target_mm: [f64; 3],
    pub arm: ArmSide,
    /// Object yaw in degrees when the caller knows it.
    #[serde(default)]
    pub object_yaw_deg: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GraspPlan {
    pub arm: ArmSide,
    pub pre_grasp: Pose6D,
    pub grasp: Pose6D,
    pub post_grasp: Pose6D,
}
