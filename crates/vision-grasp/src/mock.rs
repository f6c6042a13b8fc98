use crate::{
    CameraIntrinsics, DepthCamera, DepthFrame, Detection, Detector, Frame, FramePair, GraspError,
    PixelFormat, Result,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use time::OffsetDateTime;

/// Synthetic RGB-D camera with a scripted depth image.
pub struct MockCamera {
    intrinsics: CameraIntrinsics,
    width: u32,
    height: u32,
    depth: Vec<u16>,
    fail_capture: bool,
    captures: Arc<AtomicUsize>,
    open: bool,
}

impl MockCamera {
    pub fn new(intrinsics: CameraIntrinsics, width: u32, height: u32) -> Self {
        Self {
            intrinsics,
            width,
            height,
            depth: vec![0; (width * height) as usize],
            fail_capture: false,
            captures: Arc::new(AtomicUsize::new(0)),
            open: true,
        }
    }

    pub fn with_depth_fill(mut self, mm: u16) -> Self {
        self.depth.iter_mut().for_each(|d| *d = mm);
        self
    }

    pub fn with_depth_at(mut self, u: u32, v: u32, mm: u16) -> Self {
        if u < self.width && v < self.height {
            let idx = (v * self.width + u) as usize;
            self.depth[idx] = mm;
        }
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_capture = true;
        self
    }

    /// Shared count of `capture` calls, readable after the camera is boxed.
    pub fn capture_counter(&self) -> Arc<AtomicUsize> {
        self.captures.clone()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl DepthCamera for MockCamera {
    fn open(_serial: &str) -> Result<Self> {
        Ok(Self::new(CameraIntrinsics::new(600.0, 600.0, 320.0, 240.0), 640, 480).with_depth_fill(500))
    }

    fn capture(&mut self) -> Result<FramePair> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        if self.fail_capture || !self.open {
            return Err(GraspError::Capture("mock camera capture failure".to_string()));
        }
        let ts = Some(OffsetDateTime::now_utc());
        let mut data = vec![0u8; (self.width * self.height * 3) as usize];
        for (i, px) in data.chunks_mut(3).enumerate() {
            let x = i as u32 % self.width;
            let y = i as u32 / self.width;
            px[0] = ((x + y) % 256) as u8;
            px[1] = px[0];
            px[2] = px[0];
        }
        Ok(FramePair {
            color: Frame {
                width: self.width,
                height: self.height,
                pixel_format: PixelFormat::Bgr8,
                data,
                ts,
            },
            depth: DepthFrame {
                width: self.width,
                height: self.height,
                data: self.depth.clone(),
                ts,
            },
        })
    }

    fn intrinsics(&self) -> CameraIntrinsics {
        self.intrinsics
    }

    fn close(&mut self) {
        self.open = false;
    }
}

/// Detector returning the same scripted detections on every call.
pub struct MockDetector {
    detections: Vec<Detection>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockDetector {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl Detector for MockDetector {
    fn detect(&mut self, _image: &Frame, min_confidence: f32) -> Result<Vec<Detection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GraspError::Detection("mock detector failure".to_string()));
        }
        Ok(self
            .detections
            .iter()
            .filter(|d| d.confidence >= min_confidence)
            .cloned()
            .collect())
    }
}
