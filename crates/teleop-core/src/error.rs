use arm_link::{ArmError, ArmSide};
use thiserror::Error;
use vision_grasp::GraspError;
use voice_link::LinkError;

pub type Result<T, E = TeleopError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum TeleopError {
    #[error("invalid pose preset '{0}'")]
    InvalidPreset(String),
    #[error("vision worker is busy")]
    Busy,
    #[error("{0} arm is not initialized")]
    ArmNotReady(ArmSide),
    #[error("{0} arm is busy")]
    ArmBusy(ArmSide),
    #[error("cannot start vision worker: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Arm(#[from] ArmError),
    #[error(transparent)]
    Grasp(#[from] GraspError),
    #[error(transparent)]
    Link(#[from] LinkError),
}
