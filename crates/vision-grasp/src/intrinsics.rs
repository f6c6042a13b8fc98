use crate::{GraspError, Result};
use serde::{Deserialize, Serialize};

/// Readings at or below this are treated as sensor noise.
pub const MIN_VALID_DEPTH_MM: f64 = 10.0;

/// Pinhole intrinsics of the color stream, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Back-project pixel `(u, v)` with depth in millimetres to a camera-frame point in metres.
    pub fn back_project(&self, u: f64, v: f64, depth_mm: f64) -> Result<[f64; 3]> {
        if self.fx == 0.0 || self.fy == 0.0 {
            return Err(GraspError::Detection(format!(
                "invalid intrinsics fx={} fy={}",
                self.fx, self.fy
            )));
        }
        if !(depth_mm > MIN_VALID_DEPTH_MM) {
            return Err(GraspError::Detection(format!(
                "invalid depth {depth_mm}mm at ({u}, {v})"
            )));
        }
        let z = depth_mm * 1e-3;
        let x = (u - self.cx) * z / self.fx;
        let y = (v - self.cy) * z / self.fy;
        Ok([x, y, z])
    }
}
