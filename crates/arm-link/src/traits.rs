use crate::{ArmError, GripperMotion, JogAxis, Pose6D, Result, Velocity6D, VelocityProfile};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

/// A blocking robot arm controller.
///
/// Every call maps onto one request to the arm's controller. Implementations must not
/// retry internally; callers own the retry policy.
pub trait RobotArm {
    fn connect(&mut self) -> Result<()>;

    fn disconnect(&mut self) -> Result<()>;

    fn power_on(&mut self) -> Result<()>;

    fn clear_alarm(&mut self) -> Result<()>;

    fn sync_motor_status(&mut self) -> Result<()>;

    fn set_servo_enabled(&mut self, enabled: bool) -> Result<()>;

    /// Current tool-center-point pose in the base frame.
    fn tcp_pose(&mut self) -> Result<Pose6D>;

    /// Stream one Cartesian velocity sample. The command decays after
    /// `profile.time_slice_s`, so sustained motion needs a call every tick.
    fn move_by_velocity(&mut self, velocity: &Velocity6D, profile: &VelocityProfile) -> Result<()>;

    /// Issue one discrete jog pulse; `speed_percent` is in `0.1..=100`.
    fn jog(&mut self, axis: JogAxis, speed_percent: f64) -> Result<()>;

    /// Point-to-point move. Returns `ArmError::Motion` when the controller reports failure.
    fn move_p2p(&mut self, target: &Pose6D, speed: f64, blocking: bool) -> Result<()>;

    fn open_gripper(&mut self, motion: &GripperMotion) -> Result<()>;

    fn close_gripper(&mut self, motion: &GripperMotion) -> Result<()>;
}

/// Arm handle shared between the control loop and the vision worker.
/// The mutex makes each controller call exclusive.
pub type SharedArm = Arc<Mutex<dyn RobotArm + Send>>;

pub fn share<A: RobotArm + Send + 'static>(arm: A) -> SharedArm {
    Arc::new(Mutex::new(arm))
}

pub fn lock_arm(arm: &SharedArm) -> Result<MutexGuard<'_, dyn RobotArm + Send + 'static>> {
    arm.lock()
        .map_err(|_| ArmError::Io("arm handle lock poisoned".to_string()))
}

/// Like [`lock_arm`], but `Ok(None)` while another caller holds the arm.
pub fn try_lock_arm(arm: &SharedArm) -> Result<Option<MutexGuard<'_, dyn RobotArm + Send + 'static>>> {
    match arm.try_lock() {
        Ok(guard) => Ok(Some(guard)),
        Err(TryLockError::WouldBlock) => Ok(None),
        Err(TryLockError::Poisoned(_)) => Err(ArmError::Io("arm handle lock poisoned".to_string())),
    }
}
