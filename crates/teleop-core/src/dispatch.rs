use crate::mode::ControlMode;
use arm_link::{ArmSide, JogAxis, RobotArm, Velocity6D, VelocityProfile};
use tracing::warn;

/// Turns a per-tick velocity into robot calls.
///
/// Velocity commands decay after one time slice, so the caller must dispatch every tick
/// to sustain motion. Failures are logged and the next tick simply tries again.
#[derive(Clone, Copy, Debug)]
pub struct MotionDispatcher {
    pub stream: VelocityProfile,
    pub jog_deadband: f64,
    pub max_speed: f64,
}

impl MotionDispatcher {
    /// Returns how many calls were accepted by the arm.
    pub fn dispatch(
        &self,
        arm: &mut dyn RobotArm,
        side: ArmSide,
        mode: ControlMode,
        velocity: &Velocity6D,
    ) -> usize {
        match mode {
            ControlMode::CartesianJog => match arm.move_by_velocity(velocity, &self.stream) {
                Ok(()) => 1,
                Err(e) => {
                    warn!(arm = %side, error = %e, "velocity command failed");
                    0
                }
            },
            ControlMode::OrientationJog => {
                let mut sent = 0;
                for (axis, percent) in jog_pulses(velocity, self.jog_deadband, self.max_speed) {
                    match arm.jog(axis, percent) {
                        Ok(()) => sent += 1,
                        Err(e) => warn!(arm = %side, %axis, error = %e, "jog failed"),
                    }
                }
                sent
            }
            ControlMode::PosePreset | ControlMode::VisionGuided => 0,
        }
    }
}

/// Decompose a velocity into jog pulses: component `k` maps to index `2k` when positive
/// and `2k + 1` when negative, with speed as a percentage of `max_speed`.
pub fn jog_pulses(velocity: &Velocity6D, deadband: f64, max_speed: f64) -> Vec<(JogAxis, f64)> {
    velocity
        .0
        .iter()
        .enumerate()
        .filter(|(_, v)| v.abs() > deadband)
        .filter_map(|(k, &v)| {
            let axis = JogAxis::for_component(k, v > 0.0)?;
            let percent = if max_speed > 0.0 {
                (v.abs() / max_speed * 100.0).clamp(0.1, 100.0)
            } else {
                100.0
            };
            Some((axis, percent))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arm_link::{ArmCall, MockArm};

    fn dispatcher() -> MotionDispatcher {
        MotionDispatcher {
            stream: VelocityProfile::new(100.0, 10.0, 0.1),
            jog_deadband: 0.05,
            max_speed: 100.0,
        }
    }

    #[test]
    fn cartesian_mode_streams_every_tick() {
        let mut arm = MockArm::new(ArmSide::Left);
        let v = Velocity6D([1.0, 2.0, 3.0, 0.0, 0.0, 0.0]);
        assert_eq!(
            dispatcher().dispatch(&mut arm, ArmSide::Left, ControlMode::CartesianJog, &v),
            1
        );
        assert_eq!(
            dispatcher().dispatch(
                &mut arm,
                ArmSide::Left,
                ControlMode::CartesianJog,
                &Velocity6D::ZERO
            ),
            1
        );
        assert_eq!(arm.velocities(), vec![v, Velocity6D::ZERO]);
        assert!(matches!(
            arm.calls()[0],
            ArmCall::MoveByVelocity { profile, .. } if profile == VelocityProfile::new(100.0, 10.0, 0.1)
        ));
    }

    #[test]
    fn orientation_mode_sends_one_pulse_per_component() {
        let mut arm = MockArm::new(ArmSide::Right);
        let v = Velocity6D([0.0, 0.0, 0.0, 20.0, 0.01, -250.0]);
        let n = dispatcher().dispatch(&mut arm, ArmSide::Right, ControlMode::OrientationJog, &v);
        assert_eq!(n, 2);
        assert_eq!(arm.jogs(), vec![(6, 20.0), (11, 100.0)]);
    }

    #[test]
    fn tiny_speeds_are_floored() {
        let pulses = jog_pulses(&Velocity6D([0.06, 0.0, 0.0, 0.0, 0.0, 0.0]), 0.05, 100.0);
        assert_eq!(pulses.len(), 1);
        assert_eq!(pulses[0].0.index(), 0);
        assert!((pulses[0].1 - 0.1).abs() < 1e-12);
    }

    #[test]
    fn failures_do_not_abort_the_tick() {
        let mut arm = MockArm::new(ArmSide::Left).rejecting_velocity();
        let v = Velocity6D([0.0, 0.0, 0.0, 5.0, -5.0, 0.0]);
        let n = dispatcher().dispatch(&mut arm, ArmSide::Left, ControlMode::OrientationJog, &v);
        assert_eq!(n, 0);
        assert_eq!(arm.jogs().len(), 2);
    }

    #[test]
    fn event_modes_send_nothing() {
        let mut arm = MockArm::new(ArmSide::Left);
        let v = Velocity6D([9.0; 6]);
        for mode in [ControlMode::PosePreset, ControlMode::VisionGuided] {
            assert_eq!(dispatcher().dispatch(&mut arm, ArmSide::Left, mode, &v), 0);
        }
        assert!(arm.calls().is_empty());
    }
}
