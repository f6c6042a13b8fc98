use crate::notify::{Notifier, Sound};
use crate::{Result, TeleopError};
use arm_link::{
    bring_up, lock_arm, try_lock_arm, ArmSide, GripperMotion, SharedArm, Velocity6D, VelocityProfile,
};
use tracing::{debug, info, warn};

/// What the controller knows about one arm.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArmRuntimeState {
    pub connected: bool,
    pub initialized: bool,
    pub gripper_active: bool,
    pub gripper_open: bool,
    /// Last velocity sent by the jog path.
    pub commanded: Velocity6D,
}

impl Default for ArmRuntimeState {
    fn default() -> Self {
        Self {
            connected: false,
            initialized: false,
            gripper_active: false,
            gripper_open: true,
            commanded: Velocity6D::ZERO,
        }
    }
}

/// Both arm handles with their runtime state.
#[derive(Default)]
pub struct ArmBank {
    handles: [Option<SharedArm>; 2],
    states: [ArmRuntimeState; 2],
}

impl ArmBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring an arm up and keep its handle. Returns whether it is ready for motion.
    ///
    /// A failed arm keeps its handle so cleanup can still disconnect it.
    pub fn attach(&mut self, side: ArmSide, arm: SharedArm) -> bool {
        let outcome = lock_arm(&arm).and_then(|mut guard| bring_up(&mut *guard, side.as_str()));
        let state = &mut self.states[side.index()];
        *state = ArmRuntimeState::default();
        match outcome {
            Ok(()) => {
                state.connected = true;
                state.initialized = true;
                state.gripper_active = true;
                info!(arm = %side, "arm ready");
            }
            Err(e) => {
                state.connected = !matches!(e, arm_link::ArmError::Connection(_));
                warn!(arm = %side, error = %e, "arm bring-up failed");
            }
        }
        self.handles[side.index()] = Some(arm);
        state.initialized
    }

    pub fn state(&self, side: ArmSide) -> &ArmRuntimeState {
        &self.states[side.index()]
    }

    pub fn state_mut(&mut self, side: ArmSide) -> &mut ArmRuntimeState {
        &mut self.states[side.index()]
    }

    /// Handle of an initialized arm.
    pub fn ready(&self, side: ArmSide) -> Option<&SharedArm> {
        if self.states[side.index()].initialized {
            self.handles[side.index()].as_ref()
        } else {
            None
        }
    }

    pub fn require(&self, side: ArmSide) -> Result<&SharedArm> {
        self.ready(side).ok_or(TeleopError::ArmNotReady(side))
    }

    /// Zero velocity to every initialized arm except `skip`. Failures are logged.
    ///
    /// Never waits on an arm another thread is driving; such an arm is left alone.
    pub fn stop_all(&mut self, profile: &VelocityProfile, skip: Option<ArmSide>) {
        for side in ArmSide::BOTH {
            if skip == Some(side) {
                debug!(arm = %side, "arm in use by the vision worker; stop skipped");
                continue;
            }
            let Some(arm) = self.ready(side) else {
                continue;
            };
            let sent = try_lock_arm(arm).and_then(|guard| match guard {
                Some(mut a) => a.move_by_velocity(&Velocity6D::ZERO, profile).map(|()| true),
                None => Ok(false),
            });
            match sent {
                Ok(true) => {}
                Ok(false) => warn!(arm = %side, "arm busy; stop skipped"),
                Err(e) => warn!(arm = %side, error = %e, "stop command failed"),
            }
            self.states[side.index()].commanded = Velocity6D::ZERO;
        }
    }

    /// Close an open gripper or open a closed one.
    ///
    /// A held arm is reported as busy instead of waited on.
    pub fn toggle_gripper(&mut self, side: ArmSide, motion: &GripperMotion, notifier: &dyn Notifier) {
        let state = self.states[side.index()];
        let arm = match self.handles[side.index()].as_ref() {
            Some(arm) if state.gripper_active && state.initialized => arm,
            _ => {
                notifier.sound(Sound::GripperInactive);
                notifier.status(&format!("{side} gripper inactive"));
                return;
            }
        };
        let closing = state.gripper_open;
        let result = try_lock_arm(arm).and_then(|guard| {
            let Some(mut a) = guard else {
                return Ok(false);
            };
            if closing {
                a.close_gripper(motion)?;
            } else {
                a.open_gripper(motion)?;
            }
            Ok(true)
        });
        match result {
            Ok(true) => {
                self.states[side.index()].gripper_open = !closing;
                let sound = match (side, closing) {
                    (ArmSide::Left, true) => Sound::LeftClose,
                    (ArmSide::Left, false) => Sound::LeftOpen,
                    (ArmSide::Right, true) => Sound::RightClose,
                    (ArmSide::Right, false) => Sound::RightOpen,
                };
                notifier.sound(sound);
                let what = if closing { "closed" } else { "opened" };
                notifier.status(&format!("{side} gripper {what}"));
            }
            Ok(false) => {
                warn!(arm = %side, "arm busy; gripper toggle skipped");
                notifier.sound(Sound::ActionFailGeneral);
                notifier.status(&format!("{side} arm busy"));
            }
            Err(e) => {
                warn!(arm = %side, error = %e, "gripper toggle failed");
                notifier.sound(Sound::ActionFailGeneral);
                notifier.status(&format!("{side} gripper failed: {e}"));
            }
        }
    }

    /// Disconnect every arm and forget its state.
    pub fn disconnect_all(&mut self) {
        for side in ArmSide::BOTH {
            if let Some(arm) = self.handles[side.index()].take() {
                match lock_arm(&arm).and_then(|mut a| a.disconnect()) {
                    Ok(()) => info!(arm = %side, "disconnected"),
                    Err(e) => warn!(arm = %side, error = %e, "disconnect failed"),
                }
            }
            self.states[side.index()] = ArmRuntimeState::default();
        }
    }
}
