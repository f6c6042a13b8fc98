//! teleop-core: dual-arm teleoperation
//!
//! Gamepad snapshots are matched against configured bindings, turned into per-arm velocity
//! commands for the active control mode and streamed to the arms every tick. Event controls
//! switch modes, change speed, toggle grippers, apply orientation presets and drive voice
//! recording. A confirmed clip is handed to a single background worker that asks the voice
//! command server what to do and runs the grasp pipeline.

mod error;
pub use error::{Result, TeleopError};

pub mod binding;
pub use binding::{evaluate, Activation, BindingKind, DeviceState, HatAxis, InputBinding};

pub mod action;
pub use action::{Action, Axis, BindingTable, JogFamily};

mod mode;
pub use mode::{ControlMode, ModeMachine, SharedMode, Transition};

pub mod notify;
pub use notify::{LogNotifier, Notifier, Sound};

#[cfg(any(test, feature = "mock"))]
pub use notify::{MemoryNotifier, Note};

pub mod config;
pub use config::{load_config, ConfigFile, PresetTable, RotationCorrection, Settings, SetupConfig, TeleopConfig};

pub mod synth;
pub use synth::{correct_translation, finalize, synthesize, ArmVelocities, JogSpeeds};

mod dispatch;
pub use dispatch::{jog_pulses, MotionDispatcher};

mod preset;
pub use preset::apply_preset;

mod arms;
pub use arms::{ArmBank, ArmRuntimeState};

mod worker;
pub use worker::{JobOutcome, VisionWorker, WorkerContext, WorkerGate};

mod input;
pub use input::{InputDevice, ReplayDevice};

mod controller;
pub use controller::{TeleopController, TickReport};
