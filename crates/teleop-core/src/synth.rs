//! Per-tick velocity synthesis from the active bindings.

use crate::action::{Axis, BindingTable, JogFamily};
use crate::binding::{evaluate, DeviceState};
use crate::config::RotationCorrection;
use crate::mode::ControlMode;
use arm_link::frames::rotation_from_rpy;
use arm_link::{ArmSide, Velocity6D};
use nalgebra::Vector3;

/// Base speeds for each jog axis group.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JogSpeeds {
    pub xy: f64,
    pub z: f64,
    pub rpy: f64,
}

impl JogSpeeds {
    fn for_axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X | Axis::Y => self.xy,
            Axis::Z => self.z,
            Axis::Roll | Axis::Pitch | Axis::Yaw => self.rpy,
        }
    }
}

/// Velocity per arm, indexed by [`ArmSide::index`].
pub type ArmVelocities = [Velocity6D; 2];

/// Raw (uncorrected) command for every arm.
pub fn synthesize(
    mode: ControlMode,
    bindings: &BindingTable,
    state: &DeviceState,
    speeds: &JogSpeeds,
) -> ArmVelocities {
    let mut out = [Velocity6D::ZERO; 2];
    let family = match mode {
        ControlMode::CartesianJog => JogFamily::Translation,
        ControlMode::OrientationJog => JogFamily::Rotation,
        ControlMode::PosePreset | ControlMode::VisionGuided => return out,
    };
    for (arm, axis, sign, binding) in bindings.jogs(family) {
        let act = evaluate(binding, state);
        if act.active {
            out[arm.index()].0[axis.component()] = speeds.for_axis(axis) * act.magnitude * sign;
        }
    }
    out
}

/// `v · R` for a row vector `v`. `None` if the result is not finite.
pub fn correct_translation(v: [f64; 3], correction_deg: [f64; 3]) -> Option<[f64; 3]> {
    let r = rotation_from_rpy(correction_deg);
    let out = r.transpose() * Vector3::new(v[0], v[1], v[2]);
    out.iter()
        .all(|c| c.is_finite())
        .then(|| [out[0], out[1], out[2]])
}

/// Apply mode-specific post-processing to a raw command.
///
/// Translation jogs are rotated into each arm's base frame and lose any angular part.
/// Orientation jogs keep only the angular part. Other modes yield zero.
pub fn finalize(
    mode: ControlMode,
    raw: ArmVelocities,
    correction: &RotationCorrection,
) -> ArmVelocities {
    let mut out = [Velocity6D::ZERO; 2];
    for arm in ArmSide::BOTH {
        let v = raw[arm.index()];
        let slot = &mut out[arm.index()];
        match mode {
            ControlMode::CartesianJog => {
                match correct_translation(v.linear(), correction.for_arm(arm)) {
                    Some(t) => slot.set_linear(t),
                    None => tracing::warn!(%arm, "rotation correction failed; translation zeroed"),
                }
            }
            ControlMode::OrientationJog => slot.set_angular(v.angular()),
            ControlMode::PosePreset | ControlMode::VisionGuided => {}
        }
    }
    out
}
