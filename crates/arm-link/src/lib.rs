//! arm-link: robot arm capability abstractions
//!
//! This crate provides the data model shared by the teleoperation stack (poses, velocity
//! vectors, arm sides), the frame math used to chain calibration transforms, and the
//! `RobotArm` trait that every arm backend implements. The default build enables a `mock`
//! backend so that binaries can run on any host without a vendor controller.

mod types;
pub use types::{ArmSide, GripperMotion, JogAxis, Pose6D, Velocity6D, VelocityProfile};

mod error;
pub use error::{ArmError, Result};

pub mod frames;
pub use frames::{Matrix4, TransformError};

mod traits;
pub use traits::{lock_arm, share, try_lock_arm, RobotArm, SharedArm};

mod bringup;
pub use bringup::bring_up;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{ArmCall, MockArm};
