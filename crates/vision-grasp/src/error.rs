use arm_link::{ArmError, ArmSide, TransformError};
use thiserror::Error;

pub type Result<T, E = GraspError> = core::result::Result<T, E>;

/// Something the grasp pipeline needs before it may move an arm.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreconditionError {
    #[error("{0} arm is not initialized")]
    ArmNotInitialized(ArmSide),
    #[error("camera '{0}' is not available")]
    CameraMissing(String),
    #[error("no detector model for '{0}' and no default model")]
    ModelMissing(String),
    #[error("no hand-eye calibration for the {0} arm")]
    CalibrationMissing(ArmSide),
}

#[derive(Debug, Error)]
pub enum GraspError {
    #[error("precondition failed: {0}")]
    Precondition(#[from] PreconditionError),
    #[error("tcp pose unavailable: {0}")]
    PoseUnavailable(String),
    #[error("frame capture failed: {0}")]
    Capture(String),
    #[error("detection failed: {0}")]
    Detection(String),
    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),
    #[error("motion failed: {0}")]
    Motion(String),
    #[error("gripper failed: {0}")]
    Gripper(String),
    #[error("grasp cancelled")]
    Cancelled,
    #[error("I/O error: {0}")]
    Io(String),
    #[error("grasp failed after {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },
}

impl From<ArmError> for GraspError {
    fn from(e: ArmError) -> Self {
        match e {
            ArmError::PoseUnavailable(msg) => GraspError::PoseUnavailable(msg),
            ArmError::Gripper(msg) => GraspError::Gripper(msg),
            other => GraspError::Motion(other.to_string()),
        }
    }
}
