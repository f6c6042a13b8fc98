use crate::{depth, CameraIntrinsics, DepthFrame, Detection, Frame, FramePair, Result};

/// An RGB-D camera mounted on an arm.
pub trait DepthCamera {
    /// Open a camera by serial number.
    fn open(serial: &str) -> Result<Self>
    where
        Self: Sized;

    /// Capture one aligned color + depth pair.
    fn capture(&mut self) -> Result<FramePair>;

    /// Color-stream pinhole intrinsics.
    fn intrinsics(&self) -> CameraIntrinsics;

    /// Depth in millimetres at a color pixel, searching outward from zero readings.
    fn sample_depth(&self, frame: &DepthFrame, u: u32, v: u32, max_radius: u32) -> Option<u16> {
        depth::nearest_valid_depth(frame, u, v, max_radius)
    }

    fn close(&mut self) {}
}

/// An object detector bound to one model.
pub trait Detector {
    /// Detections with confidence at or above `min_confidence`.
    fn detect(&mut self, image: &Frame, min_confidence: f32) -> Result<Vec<Detection>>;
}
