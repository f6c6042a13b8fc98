use crate::{
    ArmError, ArmSide, GripperMotion, JogAxis, Pose6D, Result, RobotArm, Velocity6D,
    VelocityProfile,
};
use std::collections::VecDeque;

/// A call observed by [`MockArm`].
#[derive(Clone, Debug, PartialEq)]
pub enum ArmCall {
    Connect,
    Disconnect,
    PowerOn,
    ClearAlarm,
    SyncMotorStatus,
    ServoEnable(bool),
    TcpPose,
    MoveByVelocity {
        velocity: Velocity6D,
        profile: VelocityProfile,
    },
    Jog {
        axis: u8,
        speed_percent: f64,
    },
    MoveP2p {
        target: Pose6D,
        speed: f64,
        blocking: bool,
    },
    OpenGripper(GripperMotion),
    CloseGripper(GripperMotion),
}

/// In-process arm that records every call and moves instantly.
pub struct MockArm {
    side: ArmSide,
    pose: Pose6D,
    calls: Vec<ArmCall>,
    reachable: bool,
    motor_sync_ok: bool,
    pose_reads_ok: bool,
    velocity_ok: bool,
    gripper_ok: bool,
    moves_ok: bool,
    move_script: VecDeque<bool>,
}

impl MockArm {
    pub fn new(side: ArmSide) -> Self {
        Self {
            side,
            pose: Pose6D::new(300.0, 0.0, 400.0, 180.0, 0.0, 0.0),
            calls: Vec::new(),
            reachable: true,
            motor_sync_ok: true,
            pose_reads_ok: true,
            velocity_ok: true,
            gripper_ok: true,
            moves_ok: true,
            move_script: VecDeque::new(),
        }
    }

    pub fn with_pose(mut self, pose: Pose6D) -> Self {
        self.pose = pose;
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    pub fn failing_motor_sync(mut self) -> Self {
        self.motor_sync_ok = false;
        self
    }

    pub fn failing_pose_reads(mut self) -> Self {
        self.pose_reads_ok = false;
        self
    }

    pub fn rejecting_velocity(mut self) -> Self {
        self.velocity_ok = false;
        self
    }

    pub fn failing_gripper(mut self) -> Self {
        self.gripper_ok = false;
        self
    }

    pub fn failing_moves(mut self) -> Self {
        self.moves_ok = false;
        self
    }

    /// Outcomes for the next point-to-point moves, consumed in order.
    pub fn with_move_results(mut self, results: impl IntoIterator<Item = bool>) -> Self {
        self.move_script = results.into_iter().collect();
        self
    }

    pub fn side(&self) -> ArmSide {
        self.side
    }

    pub fn pose(&self) -> Pose6D {
        self.pose
    }

    pub fn calls(&self) -> &[ArmCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn p2p_moves(&self) -> Vec<Pose6D> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ArmCall::MoveP2p { target, .. } => Some(*target),
                _ => None,
            })
            .collect()
    }

    pub fn jogs(&self) -> Vec<(u8, f64)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ArmCall::Jog {
                    axis,
                    speed_percent,
                } => Some((*axis, *speed_percent)),
                _ => None,
            })
            .collect()
    }

    pub fn velocities(&self) -> Vec<Velocity6D> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ArmCall::MoveByVelocity { velocity, .. } => Some(*velocity),
                _ => None,
            })
            .collect()
    }
}

impl RobotArm for MockArm {
    fn connect(&mut self) -> Result<()> {
        self.calls.push(ArmCall::Connect);
        if self.reachable {
            Ok(())
        } else {
            Err(ArmError::Connection(format!("mock {} arm offline", self.side)))
        }
    }

    fn disconnect(&mut self) -> Result<()> {
        self.calls.push(ArmCall::Disconnect);
        Ok(())
    }

    fn power_on(&mut self) -> Result<()> {
        self.calls.push(ArmCall::PowerOn);
        Ok(())
    }

    fn clear_alarm(&mut self) -> Result<()> {
        self.calls.push(ArmCall::ClearAlarm);
        Ok(())
    }

    fn sync_motor_status(&mut self) -> Result<()> {
        self.calls.push(ArmCall::SyncMotorStatus);
        if self.motor_sync_ok {
            Ok(())
        } else {
            Err(ArmError::Rejected("motor status sync".to_string()))
        }
    }

    fn set_servo_enabled(&mut self, enabled: bool) -> Result<()> {
        self.calls.push(ArmCall::ServoEnable(enabled));
        Ok(())
    }

    fn tcp_pose(&mut self) -> Result<Pose6D> {
        self.calls.push(ArmCall::TcpPose);
        if self.pose_reads_ok {
            Ok(self.pose)
        } else {
            Err(ArmError::PoseUnavailable("mock pose read failure".to_string()))
        }
    }

    fn move_by_velocity(&mut self, velocity: &Velocity6D, profile: &VelocityProfile) -> Result<()> {
        self.calls.push(ArmCall::MoveByVelocity {
            velocity: *velocity,
            profile: *profile,
        });
        if self.velocity_ok {
            Ok(())
        } else {
            Err(ArmError::Rejected("velocity command".to_string()))
        }
    }

    fn jog(&mut self, axis: JogAxis, speed_percent: f64) -> Result<()> {
        self.calls.push(ArmCall::Jog {
            axis: axis.index(),
            speed_percent,
        });
        if self.velocity_ok {
            Ok(())
        } else {
            Err(ArmError::Rejected(format!("jog {axis}")))
        }
    }

    fn move_p2p(&mut self, target: &Pose6D, speed: f64, blocking: bool) -> Result<()> {
        self.calls.push(ArmCall::MoveP2p {
            target: *target,
            speed,
            blocking,
        });
        let ok = self.move_script.pop_front().unwrap_or(self.moves_ok);
        if ok {
            self.pose = *target;
            Ok(())
        } else {
            Err(ArmError::Motion("mock move reported failure".to_string()))
        }
    }

    fn open_gripper(&mut self, motion: &GripperMotion) -> Result<()> {
        self.calls.push(ArmCall::OpenGripper(*motion));
        if self.gripper_ok {
            Ok(())
        } else {
            Err(ArmError::Gripper("open".to_string()))
        }
    }

    fn close_gripper(&mut self, motion: &GripperMotion) -> Result<()> {
        self.calls.push(ArmCall::CloseGripper(*motion));
        if self.gripper_ok {
            Ok(())
        } else {
            Err(ArmError::Gripper("close".to_string()))
        }
    }
}
