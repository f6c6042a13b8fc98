use core::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::notify::Sound;

/// System-wide operating mode. Cycles in declaration order.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum ControlMode {
    #[default]
    CartesianJog,
    OrientationJog,
    PosePreset,
    VisionGuided,
}

impl ControlMode {
    pub const ALL: [ControlMode; 4] = [
        ControlMode::CartesianJog,
        ControlMode::OrientationJog,
        ControlMode::PosePreset,
        ControlMode::VisionGuided,
    ];

    pub fn next(self) -> Self {
        match self {
            ControlMode::CartesianJog => ControlMode::OrientationJog,
            ControlMode::OrientationJog => ControlMode::PosePreset,
            ControlMode::PosePreset => ControlMode::VisionGuided,
            ControlMode::VisionGuided => ControlMode::CartesianJog,
        }
    }

    pub fn is_jog(self) -> bool {
        matches!(self, ControlMode::CartesianJog | ControlMode::OrientationJog)
    }

    /// Cue played on entering the mode.
    pub fn entry_sound(self) -> Sound {
        match self {
            ControlMode::CartesianJog => Sound::XyzMode,
            ControlMode::OrientationJog => Sound::RpyMode,
            ControlMode::PosePreset => Sound::ResetMode,
            ControlMode::VisionGuided => Sound::VisionEnter,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            ControlMode::CartesianJog => 0,
            ControlMode::OrientationJog => 1,
            ControlMode::PosePreset => 2,
            ControlMode::VisionGuided => 3,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => ControlMode::OrientationJog,
            2 => ControlMode::PosePreset,
            3 => ControlMode::VisionGuided,
            _ => ControlMode::CartesianJog,
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ControlMode::CartesianJog => "xyz",
            ControlMode::OrientationJog => "rpy",
            ControlMode::PosePreset => "preset",
            ControlMode::VisionGuided => "vision",
        })
    }
}

/// Current mode readable from other threads.
#[derive(Clone, Debug, Default)]
pub struct SharedMode(Arc<AtomicU8>);

impl SharedMode {
    pub fn get(&self) -> ControlMode {
        ControlMode::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn set(&self, mode: ControlMode) {
        self.0.store(mode.to_u8(), Ordering::SeqCst);
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Transition {
    pub from: ControlMode,
    pub to: ControlMode,
}

/// Owns the active mode and interprets the mode-switch control.
///
/// A transition fires when the control is released after a press shorter than
/// `long_press`. Longer presses are ignored.
#[derive(Debug)]
pub struct ModeMachine {
    mode: ControlMode,
    shared: SharedMode,
    long_press: Duration,
    pressed_at: Option<Instant>,
}

impl ModeMachine {
    pub fn new(long_press: Duration) -> Self {
        Self {
            mode: ControlMode::CartesianJog,
            shared: SharedMode::default(),
            long_press,
            pressed_at: None,
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn shared(&self) -> SharedMode {
        self.shared.clone()
    }

    /// Feed the mode-switch control level for this tick.
    pub fn observe(&mut self, pressed: bool, now: Instant) -> Option<Transition> {
        match (pressed, self.pressed_at) {
            (true, None) => {
                self.pressed_at = Some(now);
                None
            }
            (false, Some(t0)) => {
                self.pressed_at = None;
                let held = now.saturating_duration_since(t0);
                if held < self.long_press {
                    Some(self.advance())
                } else {
                    tracing::debug!(held_ms = held.as_millis() as u64, "long press ignored");
                    None
                }
            }
            _ => None,
        }
    }

    /// Move to the next mode unconditionally.
    pub fn advance(&mut self) -> Transition {
        let from = self.mode;
        self.mode = from.next();
        self.shared.set(self.mode);
        tracing::info!(%from, to = %self.mode, "control mode switched");
        Transition { from, to: self.mode }
    }
}
