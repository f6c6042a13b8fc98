use crate::{
    plan_grasp, select_closest, DepthCamera, DetectionResult, Detector, GraspError, GraspPlan,
    GraspRequest, MotionGate, PreconditionError, Result,
};
use arm_link::frames::{compose, pose_to_matrix, transform_point};
use arm_link::{lock_arm, ArmSide, GripperMotion, Matrix4, Pose6D, SharedArm};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Detector registered under this key serves any object without its own model.
pub const DEFAULT_MODEL_KEY: &str = "default";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraspSettings {
    pub confidence_threshold: f32,
    /// Whole perception + motion attempts per request.
    pub max_attempts: u32,
    pub observation_move: bool,
    pub observation_height_mm: f64,
    pub pre_grasp_offset_mm: f64,
    /// Must exceed `pre_grasp_offset_mm`.
    pub post_grasp_lift_mm: f64,
    pub move_speed: f64,
    pub grasp_speed: f64,
    pub gripper_speed: u32,
    pub gripper_force: u32,
    pub max_depth_search_radius: u32,
    pub left_grasp_rpy: [f64; 3],
    pub right_grasp_rpy: [f64; 3],
    pub retry_pause_ms: u64,
}

impl Default for GraspSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            max_attempts: 2,
            observation_move: false,
            observation_height_mm: 250.0,
            pre_grasp_offset_mm: 100.0,
            post_grasp_lift_mm: 150.0,
            move_speed: 50.0,
            grasp_speed: 30.0,
            gripper_speed: 150,
            gripper_force: 100,
            max_depth_search_radius: 20,
            left_grasp_rpy: [180.0, 0.0, 180.0],
            right_grasp_rpy: [180.0, 0.0, 0.0],
            retry_pause_ms: 500,
        }
    }
}

impl GraspSettings {
    pub fn tool_down_rpy(&self, arm: ArmSide) -> [f64; 3] {
        match arm {
            ArmSide::Left => self.left_grasp_rpy,
            ArmSide::Right => self.right_grasp_rpy,
        }
    }

    fn gripper(&self) -> GripperMotion {
        GripperMotion {
            speed: self.gripper_speed,
            force: self.gripper_force,
            wait: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraspOutcome {
    pub plan: GraspPlan,
    pub detection: DetectionResult,
    pub attempts: u32,
}

/// Everything a grasp touches: initialized arms, hand cameras, detector models and
/// hand-eye calibrations.
#[derive(Default)]
pub struct VisionRig {
    arms: HashMap<ArmSide, SharedArm>,
    cameras: HashMap<String, Box<dyn DepthCamera + Send>>,
    detectors: HashMap<String, Box<dyn Detector + Send>>,
    calibration: HashMap<ArmSide, Matrix4>,
}

/// Name of the camera mounted on an arm's hand.
pub fn hand_camera(arm: ArmSide) -> String {
    format!("{arm}_hand")
}

impl VisionRig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an arm that has completed bring-up.
    pub fn insert_arm(&mut self, side: ArmSide, arm: SharedArm) {
        self.arms.insert(side, arm);
    }

    pub fn remove_arm(&mut self, side: ArmSide) {
        self.arms.remove(&side);
    }

    pub fn insert_camera(&mut self, name: impl Into<String>, camera: Box<dyn DepthCamera + Send>) {
        self.cameras.insert(name.into(), camera);
    }

    pub fn insert_detector(&mut self, model: impl Into<String>, detector: Box<dyn Detector + Send>) {
        self.detectors.insert(model.into(), detector);
    }

    pub fn set_calibration(&mut self, side: ArmSide, end_to_camera: Matrix4) {
        self.calibration.insert(side, end_to_camera);
    }

    pub fn camera_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cameras.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn close_cameras(&mut self) {
        for (name, cam) in self.cameras.iter_mut() {
            info!(camera = %name, "closing camera");
            cam.close();
        }
        self.cameras.clear();
    }

    fn model_key<'a>(&self, object_id: &'a str) -> Option<&'a str> {
        if self.detectors.contains_key(object_id) {
            Some(object_id)
        } else if self.detectors.contains_key(DEFAULT_MODEL_KEY) {
            Some(DEFAULT_MODEL_KEY)
        } else {
            None
        }
    }

    pub fn check_preconditions(&self, request: &GraspRequest) -> Result<(), PreconditionError> {
        if !self.arms.contains_key(&request.arm) {
            return Err(PreconditionError::ArmNotInitialized(request.arm));
        }
        let cam = hand_camera(request.arm);
        if !self.cameras.contains_key(&cam) {
            return Err(PreconditionError::CameraMissing(cam));
        }
        if self.model_key(&request.object_id).is_none() {
            return Err(PreconditionError::ModelMissing(request.object_id.clone()));
        }
        if !self.calibration.contains_key(&request.arm) {
            return Err(PreconditionError::CalibrationMissing(request.arm));
        }
        Ok(())
    }

    /// Run a grasp request to completion or exhaustion.
    ///
    /// Preconditions are checked before any motion. Each attempt re-captures, re-detects and
    /// re-plans; a failure anywhere in an attempt moves on to the next one. `gate` is polled
    /// before every blocking step.
    pub fn execute(
        &mut self,
        request: &GraspRequest,
        settings: &GraspSettings,
        gate: &dyn MotionGate,
    ) -> Result<GraspOutcome> {
        self.check_preconditions(request)?;
        let side = request.arm;
        let cam_key = hand_camera(side);
        let model_key = self
            .model_key(&request.object_id)
            .ok_or_else(|| PreconditionError::ModelMissing(request.object_id.clone()))?
            .to_string();
        let arm = self
            .arms
            .get(&side)
            .cloned()
            .ok_or(PreconditionError::ArmNotInitialized(side))?;
        let end_to_camera = *self
            .calibration
            .get(&side)
            .ok_or(PreconditionError::CalibrationMissing(side))?;
        let camera = self
            .cameras
            .get_mut(&cam_key)
            .ok_or_else(|| PreconditionError::CameraMissing(cam_key.clone()))?;
        let detector = self
            .detectors
            .get_mut(&model_key)
            .ok_or_else(|| PreconditionError::ModelMissing(request.object_id.clone()))?;

        info!(
            object = %request.object_id,
            arm = %side,
            model = %model_key,
            target = ?request.approx_target_mm,
            "starting grasp"
        );

        let attempts = settings.max_attempts;
        for attempt in 1..=attempts {
            gate.check()?;
            info!(attempt, attempts, "grasp attempt");

            if settings.observation_move {
                if let Err(e) = observe(&arm, request, settings) {
                    warn!(attempt, error = %e, "observation move failed");
                    pause_before_retry(attempt, attempts, settings);
                    continue;
                }
                gate.check()?;
            }

            let (point_mm, detection) = match perceive(
                camera.as_mut(),
                detector.as_mut(),
                &arm,
                &end_to_camera,
                request,
                settings,
            ) {
                Ok(found) => found,
                Err(e) => {
                    warn!(attempt, error = %e, "perception failed");
                    pause_before_retry(attempt, attempts, settings);
                    continue;
                }
            };

            let plan = plan_grasp(point_mm, side, request.object_yaw_deg, settings);
            info!(
                grasp = ?plan.grasp.to_array(),
                depth_mm = detection.depth_mm,
                "grasp planned"
            );

            match run_sequence(&arm, &plan, settings, gate) {
                Ok(()) => {
                    info!(attempt, "grasp succeeded");
                    return Ok(GraspOutcome {
                        plan,
                        detection,
                        attempts: attempt,
                    });
                }
                Err(GraspError::Cancelled) => return Err(GraspError::Cancelled),
                Err(e) => {
                    warn!(attempt, error = %e, "grasp sequence failed");
                    pause_before_retry(attempt, attempts, settings);
                }
            }
        }
        warn!(attempts, "grasp attempts exhausted");
        Err(GraspError::AttemptsExhausted { attempts })
    }
}

fn pause_before_retry(attempt: u32, attempts: u32, settings: &GraspSettings) {
    if attempt < attempts && settings.retry_pause_ms > 0 {
        thread::sleep(Duration::from_millis(settings.retry_pause_ms));
    }
}

fn observe(arm: &SharedArm, request: &GraspRequest, settings: &GraspSettings) -> Result<()> {
    let [x, y, z] = request.approx_target_mm;
    let target = Pose6D::from_parts(
        [x, y, z + settings.observation_height_mm],
        settings.tool_down_rpy(request.arm),
    );
    lock_arm(arm)?.move_p2p(&target, settings.move_speed, true)?;
    Ok(())
}

/// Capture, detect and locate the requested object in the arm's base frame (mm).
fn perceive(
    camera: &mut (dyn DepthCamera + Send),
    detector: &mut (dyn Detector + Send),
    arm: &SharedArm,
    end_to_camera: &Matrix4,
    request: &GraspRequest,
    settings: &GraspSettings,
) -> Result<([f64; 3], DetectionResult)> {
    let frames = camera.capture()?;
    let detections = detector.detect(&frames.color, settings.confidence_threshold)?;
    let detection = select_closest(
        &detections,
        &request.object_id,
        settings.confidence_threshold,
        &frames.depth,
        &*camera,
        settings.max_depth_search_radius,
    )
    .ok_or_else(|| {
        GraspError::Detection(format!(
            "'{}' not found with valid depth among {} detections",
            request.object_id,
            detections.len()
        ))
    })?;

    let (u, v) = detection.bbox.center();
    let point_cam_m = camera
        .intrinsics()
        .back_project(u as f64, v as f64, detection.depth_mm)?;

    let tcp = lock_arm(arm)?.tcp_pose()?;
    let base_to_camera = compose(&pose_to_matrix(&tcp), end_to_camera);
    let p = transform_point(&base_to_camera, point_cam_m);
    if p.iter().any(|c| !c.is_finite()) {
        return Err(GraspError::Transform(arm_link::TransformError::NonFinite));
    }
    Ok(([p[0] * 1000.0, p[1] * 1000.0, p[2] * 1000.0], detection))
}

/// Open, approach, descend, close, lift. Every step blocks and is checked.
fn run_sequence(
    arm: &SharedArm,
    plan: &GraspPlan,
    settings: &GraspSettings,
    gate: &dyn MotionGate,
) -> Result<()> {
    let gripper = settings.gripper();

    gate.check()?;
    lock_arm(arm)?.open_gripper(&gripper)?;

    gate.check()?;
    lock_arm(arm)?.move_p2p(&plan.pre_grasp, settings.move_speed, true)?;

    gate.check()?;
    lock_arm(arm)?.move_p2p(&plan.grasp, settings.grasp_speed, true)?;

    gate.check()?;
    lock_arm(arm)?.close_gripper(&gripper)?;

    gate.check()?;
    lock_arm(arm)?.move_p2p(&plan.post_grasp, settings.move_speed, true)?;
    Ok(())
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::{BoundingBox, CameraIntrinsics, CancelFlag, Detection, MockCamera, MockDetector};
    use arm_link::frames::pose_to_matrix;
    use arm_link::{ArmCall, MockArm};
    use std::sync::atomic::Ordering;
    use std::sync::{Arc, Mutex};

    fn settings() -> GraspSettings {
        GraspSettings {
            retry_pause_ms: 0,
            ..GraspSettings::default()
        }
    }

    fn cup_at(u: f64, v: f64) -> Detection {
        Detection {
            bbox: BoundingBox::new(u - 20.0, v - 15.0, u + 20.0, v + 15.0),
            class_label: "cup".to_string(),
            confidence: 0.9,
        }
    }

    fn request(arm: ArmSide) -> GraspRequest {
        GraspRequest {
            object_id: "cup".to_string(),
            approx_target_mm: [400.0, 0.0, 100.0],
            arm,
            object_yaw_deg: None,
        }
    }

    struct Fixture {
        rig: VisionRig,
        arm: Arc<Mutex<MockArm>>,
        captures: Arc<std::sync::atomic::AtomicUsize>,
    }

    fn fixture(arm: MockArm, detector: MockDetector, depth_mm: u16) -> Fixture {
        let side = arm.side();
        let arm = Arc::new(Mutex::new(arm));
        let camera = MockCamera::new(CameraIntrinsics::new(600.0, 600.0, 320.0, 240.0), 640, 480)
            .with_depth_fill(depth_mm);
        let captures = camera.capture_counter();
        let mut rig = VisionRig::new();
        rig.insert_arm(side, arm.clone());
        rig.insert_camera(hand_camera(side), Box::new(camera));
        rig.insert_detector(DEFAULT_MODEL_KEY, Box::new(detector));
        rig.set_calibration(side, Matrix4::identity());
        Fixture {
            rig,
            arm,
            captures,
        }
    }

    #[test]
    fn base_point_matches_analytic_chain() {
        let tcp = Pose6D::new(100.0, 200.0, 300.0, 0.0, 0.0, 90.0);
        let mut fx = fixture(
            MockArm::new(ArmSide::Left).with_pose(tcp),
            MockDetector::new(vec![cup_at(380.0, 240.0)]),
            500,
        );
        let outcome = fx
            .rig
            .execute(&request(ArmSide::Left), &settings(), &CancelFlag::new())
            .unwrap();

        // pixel (380, 240) at 0.5 m -> camera point (0.05, 0, 0.5)
        let expected = transform_point(&pose_to_matrix(&tcp), [0.05, 0.0, 0.5]);
        let got = outcome.plan.grasp.translation();
        for i in 0..3 {
            assert!((got[i] - expected[i] * 1000.0).abs() < 1e-6, "{got:?} vs {expected:?}");
        }
        // yaw 90 maps camera x onto base y
        assert!((got[0] - 100.0).abs() < 1e-6);
        assert!((got[1] - 250.0).abs() < 1e-6);
        assert!((got[2] - 800.0).abs() < 1e-6);
        assert_eq!(outcome.attempts, 1);
    }

    #[test]
    fn sequence_order_and_speeds() {
        let mut fx = fixture(
            MockArm::new(ArmSide::Right),
            MockDetector::new(vec![cup_at(320.0, 240.0)]),
            400,
        );
        let outcome = fx
            .rig
            .execute(&request(ArmSide::Right), &settings(), &CancelFlag::new())
            .unwrap();
        let arm = fx.arm.lock().unwrap();
        let motion: Vec<&ArmCall> = arm
            .calls()
            .iter()
            .filter(|c| !matches!(c, ArmCall::TcpPose))
            .collect();
        assert_eq!(motion.len(), 5);
        assert!(matches!(motion[0], ArmCall::OpenGripper(g) if g.speed == 150 && g.force == 100 && g.wait));
        assert!(matches!(motion[1], ArmCall::MoveP2p { target, speed, blocking: true } if *target == outcome.plan.pre_grasp && *speed == 50.0));
        assert!(matches!(motion[2], ArmCall::MoveP2p { target, speed, .. } if *target == outcome.plan.grasp && *speed == 30.0));
        assert!(matches!(motion[3], ArmCall::CloseGripper(_)));
        assert!(matches!(motion[4], ArmCall::MoveP2p { target, .. } if *target == outcome.plan.post_grasp));
        assert_eq!(outcome.plan.grasp.rpy(), [180.0, 0.0, 0.0]);
    }

    #[test]
    fn failing_detector_uses_every_attempt_without_motion() {
        let detector = MockDetector::new(Vec::new());
        let detect_calls = detector.call_counter();
        let mut fx = fixture(MockArm::new(ArmSide::Left), detector, 500);
        let err = fx
            .rig
            .execute(&request(ArmSide::Left), &settings(), &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, GraspError::AttemptsExhausted { attempts: 2 }));
        assert_eq!(fx.captures.load(Ordering::SeqCst), 2);
        assert_eq!(detect_calls.load(Ordering::SeqCst), 2);
        assert!(fx.arm.lock().unwrap().p2p_moves().is_empty());
    }

    #[test]
    fn capture_failure_is_retried_then_exhausted() {
        let arm = Arc::new(Mutex::new(MockArm::new(ArmSide::Right)));
        let camera = MockCamera::new(CameraIntrinsics::new(600.0, 600.0, 320.0, 240.0), 640, 480)
            .with_depth_fill(500)
            .failing();
        let captures = camera.capture_counter();
        let detector = MockDetector::new(vec![cup_at(320.0, 240.0)]);
        let detect_calls = detector.call_counter();
        let mut rig = VisionRig::new();
        rig.insert_arm(ArmSide::Right, arm.clone());
        rig.insert_camera(hand_camera(ArmSide::Right), Box::new(camera));
        rig.insert_detector(DEFAULT_MODEL_KEY, Box::new(detector));
        rig.set_calibration(ArmSide::Right, Matrix4::identity());

        let err = rig
            .execute(&request(ArmSide::Right), &settings(), &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, GraspError::AttemptsExhausted { attempts: 2 }));
        assert_eq!(captures.load(Ordering::SeqCst), 2);
        assert_eq!(detect_calls.load(Ordering::SeqCst), 0);
        let arm = arm.lock().unwrap();
        assert!(arm.p2p_moves().is_empty());
        assert!(!arm
            .calls()
            .iter()
            .any(|c| matches!(c, ArmCall::OpenGripper(_) | ArmCall::CloseGripper(_))));
    }

    #[test]
    fn failed_move_retries_whole_attempt() {
        let mut fx = fixture(
            MockArm::new(ArmSide::Left).with_move_results([true, false]),
            MockDetector::new(vec![cup_at(320.0, 240.0)]),
            500,
        );
        let outcome = fx
            .rig
            .execute(&request(ArmSide::Left), &settings(), &CancelFlag::new())
            .unwrap();
        assert_eq!(outcome.attempts, 2);
        assert_eq!(fx.captures.load(Ordering::SeqCst), 2);
        // pre-grasp ok, grasp failed, then a full second sequence
        assert_eq!(fx.arm.lock().unwrap().p2p_moves().len(), 5);
    }

    #[test]
    fn missing_calibration_stops_before_motion() {
        let arm = Arc::new(Mutex::new(MockArm::new(ArmSide::Left)));
        let camera = MockCamera::new(CameraIntrinsics::new(600.0, 600.0, 320.0, 240.0), 640, 480);
        let captures = camera.capture_counter();
        let mut rig = VisionRig::new();
        rig.insert_arm(ArmSide::Left, arm.clone());
        rig.insert_camera("left_hand", Box::new(camera));
        rig.insert_detector("cup", Box::new(MockDetector::new(vec![cup_at(320.0, 240.0)])));
        let err = rig
            .execute(&request(ArmSide::Left), &settings(), &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(
            err,
            GraspError::Precondition(PreconditionError::CalibrationMissing(ArmSide::Left))
        ));
        assert_eq!(captures.load(Ordering::SeqCst), 0);
        assert!(arm.lock().unwrap().calls().is_empty());
    }

    #[test]
    fn precondition_order() {
        let rig = VisionRig::new();
        assert_eq!(
            rig.check_preconditions(&request(ArmSide::Right)),
            Err(PreconditionError::ArmNotInitialized(ArmSide::Right))
        );
        let mut rig = VisionRig::new();
        rig.insert_arm(ArmSide::Right, Arc::new(Mutex::new(MockArm::new(ArmSide::Right))));
        assert_eq!(
            rig.check_preconditions(&request(ArmSide::Right)),
            Err(PreconditionError::CameraMissing("right_hand".to_string()))
        );
        rig.insert_camera(
            "right_hand",
            Box::new(MockCamera::new(CameraIntrinsics::new(600.0, 600.0, 320.0, 240.0), 640, 480)),
        );
        assert_eq!(
            rig.check_preconditions(&request(ArmSide::Right)),
            Err(PreconditionError::ModelMissing("cup".to_string()))
        );
    }

    #[test]
    fn cancelled_gate_blocks_motion() {
        let mut fx = fixture(
            MockArm::new(ArmSide::Left),
            MockDetector::new(vec![cup_at(320.0, 240.0)]),
            500,
        );
        let flag = CancelFlag::new();
        flag.cancel();
        let err = fx
            .rig
            .execute(&request(ArmSide::Left), &settings(), &flag)
            .unwrap_err();
        assert!(matches!(err, GraspError::Cancelled));
        assert_eq!(fx.captures.load(Ordering::SeqCst), 0);
        assert!(fx.arm.lock().unwrap().calls().is_empty());
    }

    #[test]
    fn observation_move_goes_above_target() {
        let mut fx = fixture(
            MockArm::new(ArmSide::Left),
            MockDetector::new(vec![cup_at(320.0, 240.0)]),
            500,
        );
        let s = GraspSettings {
            observation_move: true,
            ..settings()
        };
        fx.rig
            .execute(&request(ArmSide::Left), &s, &CancelFlag::new())
            .unwrap();
        let moves = fx.arm.lock().unwrap().p2p_moves();
        assert_eq!(moves.len(), 4);
        assert_eq!(moves[0], Pose6D::new(400.0, 0.0, 350.0, 180.0, 0.0, 180.0));
    }
}
