use thiserror::Error;

pub type Result<T, E = ArmError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ArmError {
    #[error("arm unreachable: {0}")]
    Connection(String),
    #[error("initialization failed: {0}")]
    Initialization(String),
    #[error("tcp pose unavailable: {0}")]
    PoseUnavailable(String),
    #[error("motion failed: {0}")]
    Motion(String),
    #[error("gripper command failed: {0}")]
    Gripper(String),
    #[error("command rejected by controller: {0}")]
    Rejected(String),
    #[error("timeout")]
    Timeout,
    #[error("I/O error: {0}")]
    Io(String),
}
