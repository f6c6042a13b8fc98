use crate::{ArmError, Result, RobotArm};
use tracing::{info, warn};

/// Connect and enable an arm: power on, clear alarms, sync motor status, enable servos.
///
/// A failed motor-status sync is only logged; the remaining steps are fatal.
pub fn bring_up(arm: &mut dyn RobotArm, label: &str) -> Result<()> {
    arm.connect()
        .map_err(|e| ArmError::Connection(format!("{label}: {e}")))?;
    arm.power_on()
        .map_err(|e| ArmError::Initialization(format!("{label} power on: {e}")))?;
    arm.clear_alarm()
        .map_err(|e| ArmError::Initialization(format!("{label} clear alarm: {e}")))?;
    if let Err(e) = arm.sync_motor_status() {
        warn!(arm = label, error = %e, "motor status sync failed, continuing");
    }
    arm.set_servo_enabled(true)
        .map_err(|e| ArmError::Initialization(format!("{label} servo enable: {e}")))?;
    info!(arm = label, "arm initialized");
    Ok(())
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::{ArmCall, ArmSide, MockArm};

    #[test]
    fn runs_steps_in_order() {
        let mut arm = MockArm::new(ArmSide::Left);
        bring_up(&mut arm, "left").unwrap();
        assert_eq!(
            arm.calls(),
            &[
                ArmCall::Connect,
                ArmCall::PowerOn,
                ArmCall::ClearAlarm,
                ArmCall::SyncMotorStatus,
                ArmCall::ServoEnable(true),
            ]
        );
    }

    #[test]
    fn sync_failure_is_tolerated() {
        let mut arm = MockArm::new(ArmSide::Right).failing_motor_sync();
        assert!(bring_up(&mut arm, "right").is_ok());
        assert_eq!(arm.calls().last(), Some(&ArmCall::ServoEnable(true)));
    }

    #[test]
    fn unreachable_arm_is_a_connection_error() {
        let mut arm = MockArm::new(ArmSide::Left).unreachable();
        assert!(matches!(
            bring_up(&mut arm, "left"),
            Err(ArmError::Connection(_))
        ));
        assert_eq!(arm.calls(), &[ArmCall::Connect]);
    }
}
