use crate::depth::is_valid_depth;
use crate::{DepthCamera, DepthFrame, Detection, DetectionResult};
use tracing::debug;

/// Pick the matching detection closest to the camera.
///
/// Detections are kept when their label equals `object_id` and their confidence reaches
/// `min_confidence`. Depth is sampled at the integer box center; boxes whose center falls
/// outside the depth frame, or whose depth is invalid, are skipped.
pub fn select_closest(
    detections: &[Detection],
    object_id: &str,
    min_confidence: f32,
    depth: &DepthFrame,
    camera: &dyn DepthCamera,
    max_radius: u32,
) -> Option<DetectionResult> {
    let mut best: Option<DetectionResult> = None;
    for det in detections {
        if det.class_label != object_id || det.confidence < min_confidence {
            continue;
        }
        let (u, v) = det.bbox.center();
        if !depth.contains(u, v) {
            debug!(u, v, "box center outside depth frame, skipping");
            continue;
        }
        let Some(d) = camera.sample_depth(depth, u as u32, v as u32, max_radius) else {
            continue;
        };
        let d = f64::from(d);
        if !is_valid_depth(d) {
            continue;
        }
        if best.as_ref().map_or(true, |b| d < b.depth_mm) {
            best = Some(DetectionResult {
                bbox: det.bbox,
                class_label: det.class_label.clone(),
                confidence: det.confidence,
                depth_mm: d,
            });
        }
    }
    best
}
