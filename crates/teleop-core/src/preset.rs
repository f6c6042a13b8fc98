use arm_link::{ArmError, Pose6D, RobotArm};

/// Reorient the tool in place: keep the current translation, swap in `rpy_deg` and make one
/// blocking point-to-point move. Never retried.
///
/// Returns the commanded target on success.
pub fn apply_preset(arm: &mut dyn RobotArm, rpy_deg: [f64; 3], speed: f64) -> Result<Pose6D, ArmError> {
    let current = arm.tcp_pose().map_err(|e| match e {
        ArmError::PoseUnavailable(msg) => ArmError::PoseUnavailable(msg),
        other => ArmError::PoseUnavailable(other.to_string()),
    })?;
    let target = current.with_rpy(rpy_deg);
    tracing::info!(
        from = ?current.rpy(),
        to = ?rpy_deg,
        speed,
        "applying orientation preset"
    );
    arm.move_p2p(&target, speed, true)?;
    Ok(target)
}
