use thiserror::Error;

pub type Result<T, E = LinkError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("cannot reach command server {addr}: {reason}")]
    Connect { addr: String, reason: String },
    #[error("timeout while {0}")]
    Timeout(&'static str),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{section} section of {len} bytes exceeds limit")]
    FrameTooLarge { section: &'static str, len: u32 },
    #[error("malformed request header: {0}")]
    Header(String),
    #[error("invalid JSON reply: {0}")]
    Json(#[from] serde_json::Error),
    #[error("audio error: {0}")]
    Audio(String),
    #[error("not recording")]
    NotRecording,
    #[error("already recording")]
    AlreadyRecording,
}
