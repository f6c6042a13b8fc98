//! Mock hardware assembled from the setup section.

use arm_link::{share, ArmSide, MockArm, Pose6D, SharedArm};
use teleop_core::SetupConfig;
use tracing::{info, warn};
use vision_grasp::calib::load_hand_eye;
use vision_grasp::{
    BoundingBox, CameraIntrinsics, Detection, MockCamera, MockDetector, VisionRig,
    DEFAULT_MODEL_KEY,
};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;
/// Simulated table distance seen by the hand cameras.
const DEPTH_MM: u16 = 450;

pub fn home_pose(side: ArmSide) -> Pose6D {
    match side {
        ArmSide::Left => Pose6D::new(350.0, 150.0, 300.0, 180.0, 0.0, 180.0),
        ArmSide::Right => Pose6D::new(350.0, -150.0, 300.0, 180.0, 0.0, 0.0),
    }
}

pub fn mock_arm(setup: &SetupConfig, side: ArmSide) -> SharedArm {
    info!(arm = %side, ip = setup.robot_ip(side), "using mock arm");
    share(MockArm::new(side).with_pose(home_pose(side)))
}

/// Cameras, detectors and calibrations for every configured entry.
///
/// Each detector reports one confident box in the image centre labelled with its object id.
/// A calibration file that fails to load leaves that arm uncalibrated.
pub fn vision_rig(setup: &SetupConfig) -> VisionRig {
    let mut rig = VisionRig::new();
    for (name, serial) in &setup.camera_serials {
        info!(camera = %name, %serial, "using mock depth camera");
        let intrinsics = CameraIntrinsics::new(615.0, 615.0, f64::from(WIDTH) / 2.0, f64::from(HEIGHT) / 2.0);
        rig.insert_camera(
            name.clone(),
            Box::new(MockCamera::new(intrinsics, WIDTH, HEIGHT).with_depth_fill(DEPTH_MM)),
        );
    }
    for (object, model) in &setup.yolo_models {
        info!(%object, model = %model.display(), "using mock detector");
        let label = if object == DEFAULT_MODEL_KEY { "object" } else { object.as_str() };
        let cx = f64::from(WIDTH) / 2.0;
        let cy = f64::from(HEIGHT) / 2.0;
        rig.insert_detector(
            object.clone(),
            Box::new(MockDetector::new(vec![Detection {
                bbox: BoundingBox::new(cx - 30.0, cy - 30.0, cx + 30.0, cy + 30.0),
                class_label: label.to_string(),
                confidence: 0.9,
            }])),
        );
    }
    for side in ArmSide::BOTH {
        let Some(path) = setup.calibration_file(side) else {
            continue;
        };
        match load_hand_eye(path) {
            Ok(m) => {
                info!(arm = %side, file = %path.display(), "hand-eye calibration loaded");
                rig.set_calibration(side, m);
            }
            Err(e) => warn!(arm = %side, file = %path.display(), error = %e, "calibration not loaded"),
        }
    }
    rig
}
