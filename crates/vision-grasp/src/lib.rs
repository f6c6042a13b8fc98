//! vision-grasp: camera and detector abstractions plus the grasp pipeline
//!
//! A grasp request goes through detection, depth back-projection, the hand-eye frame chain
//! and a gripper/motion sequence, retried as a whole a bounded number of times.

mod types;
pub use types::{
    BoundingBox, DepthFrame, Detection, DetectionResult, Frame, FramePair, GraspPlan,
    GraspRequest, PixelFormat,
};

mod error;
pub use error::{GraspError, PreconditionError, Result};

mod traits;
pub use traits::{DepthCamera, Detector};

pub mod intrinsics;
pub use intrinsics::CameraIntrinsics;

pub mod depth;

pub mod calib;

mod select;
pub use select::select_closest;

mod plan;
pub use plan::plan_grasp;

mod cancel;
pub use cancel::{CancelFlag, MotionGate};

mod orchestrator;
pub use orchestrator::{hand_camera, GraspOutcome, GraspSettings, VisionRig, DEFAULT_MODEL_KEY};

#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "mock")]
pub use mock::{MockCamera, MockDetector};
