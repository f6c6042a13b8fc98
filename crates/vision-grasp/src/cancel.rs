use crate::{GraspError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Polled by the grasp pipeline between blocking steps.
pub trait MotionGate {
    /// `Err(GraspError::Cancelled)` when motion must not continue.
    fn check(&self) -> Result<()>;
}

/// Cooperative cancellation shared between the requester and a running grasp.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl MotionGate for CancelFlag {
    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(GraspError::Cancelled)
        } else {
            Ok(())
        }
    }
}
