use crate::{GraspPlan, GraspSettings};
use arm_link::{ArmSide, Pose6D};

/// Tool-down grasp at `point_mm`, with approach and lift poses straight above it.
///
/// When an object yaw is known it is added to the tool yaw, wrapped into `[0, 360)`.
pub fn plan_grasp(
    point_mm: [f64; 3],
    arm: ArmSide,
    object_yaw_deg: Option<f64>,
    settings: &GraspSettings,
) -> GraspPlan {
    let mut rpy = settings.tool_down_rpy(arm);
    if let Some(yaw) = object_yaw_deg {
        rpy[2] = (rpy[2] + yaw).rem_euclid(360.0);
    }
    let grasp = Pose6D::from_parts(point_mm, rpy);
    GraspPlan {
        arm,
        pre_grasp: grasp.raised(settings.pre_grasp_offset_mm),
        grasp,
        post_grasp: grasp.raised(settings.post_grasp_lift_mm),
    }
}
