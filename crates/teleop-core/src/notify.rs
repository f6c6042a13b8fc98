//! Operator feedback: sound cues and status lines.
//!
//! Playback itself is external. [`LogNotifier`] renders every cue as a `tracing` event with
//! the configured audio file, if any.

use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Sound {
    XyzMode,
    RpyMode,
    ResetMode,
    VisionEnter,
    SpeedChangeConfirm,
    GripperInactive,
    LeftOpen,
    LeftClose,
    RightOpen,
    RightClose,
    LeftResetSuccess,
    LeftResetFail,
    RightResetSuccess,
    RightResetFail,
    VisionRecordStart,
    VisionRecordStop,
    VisionRecordCancel,
    AlreadyRecordingError,
    NotRecordingError,
    ServerResponseReceived,
    ActionSuccessGeneral,
    ActionFailGeneral,
}

impl Sound {
    /// Key in the `audio_files` configuration map.
    pub fn key(&self) -> &'static str {
        match self {
            Sound::XyzMode => "xyz_mode",
            Sound::RpyMode => "rpy_mode",
            Sound::ResetMode => "reset_mode",
            Sound::VisionEnter => "vision_enter",
            Sound::SpeedChangeConfirm => "speed_change_confirm",
            Sound::GripperInactive => "gripper_inactive",
            Sound::LeftOpen => "left_open",
            Sound::LeftClose => "left_close",
            Sound::RightOpen => "right_open",
            Sound::RightClose => "right_close",
            Sound::LeftResetSuccess => "left_reset_success",
            Sound::LeftResetFail => "left_reset_fail",
            Sound::RightResetSuccess => "right_reset_success",
            Sound::RightResetFail => "right_reset_fail",
            Sound::VisionRecordStart => "vision_record_start",
            Sound::VisionRecordStop => "vision_record_stop",
            Sound::VisionRecordCancel => "vision_record_cancel",
            Sound::AlreadyRecordingError => "already_recording_error",
            Sound::NotRecordingError => "not_recording_error",
            Sound::ServerResponseReceived => "server_response_received",
            Sound::ActionSuccessGeneral => "action_success_general",
            Sound::ActionFailGeneral => "action_fail_general",
        }
    }
}

pub trait Notifier: Send + Sync {
    fn sound(&self, sound: Sound);
    fn status(&self, line: &str);
    /// Reply audio from the command interpreter.
    fn play_clip(&self, audio: &[u8]);
}

#[derive(Debug, Default)]
pub struct LogNotifier {
    audio_files: BTreeMap<String, String>,
}

impl LogNotifier {
    pub fn new(audio_files: BTreeMap<String, String>) -> Self {
        Self { audio_files }
    }
}

impl Notifier for LogNotifier {
    fn sound(&self, sound: Sound) {
        match self.audio_files.get(sound.key()) {
            Some(file) => tracing::info!(sound = sound.key(), file = %file, "cue"),
            None => tracing::debug!(sound = sound.key(), "cue without audio file"),
        }
    }

    fn status(&self, line: &str) {
        tracing::info!(status = line);
    }

    fn play_clip(&self, audio: &[u8]) {
        match voice_link::wav_duration_ms(audio) {
            Ok(ms) => tracing::info!(bytes = audio.len(), duration_ms = ms, "reply clip"),
            Err(e) => tracing::warn!(bytes = audio.len(), error = %e, "reply clip is not WAV"),
        }
    }
}

#[cfg(any(test, feature = "mock"))]
pub use memory::{MemoryNotifier, Note};

#[cfg(any(test, feature = "mock"))]
mod memory {
    use super::*;
    use std::sync::Mutex;

    #[derive(Clone, Debug, PartialEq)]
    pub enum Note {
        Sound(Sound),
        Status(String),
        Clip(usize),
    }

    /// Keeps every notification for later inspection.
    #[derive(Debug, Default)]
    pub struct MemoryNotifier {
        notes: Mutex<Vec<Note>>,
    }

    impl MemoryNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn notes(&self) -> Vec<Note> {
            self.notes.lock().map(|n| n.clone()).unwrap_or_default()
        }

        pub fn sounds(&self) -> Vec<Sound> {
            self.notes()
                .into_iter()
                .filter_map(|n| match n {
                    Note::Sound(s) => Some(s),
                    _ => None,
                })
                .collect()
        }

        pub fn clear(&self) {
            if let Ok(mut n) = self.notes.lock() {
                n.clear();
            }
        }

        fn push(&self, note: Note) {
            if let Ok(mut n) = self.notes.lock() {
                n.push(note);
            }
        }
    }

    impl Notifier for MemoryNotifier {
        fn sound(&self, sound: Sound) {
            self.push(Note::Sound(sound));
        }

        fn status(&self, line: &str) {
            self.push(Note::Status(line.to_string()));
        }

        fn play_clip(&self, audio: &[u8]) {
            self.push(Note::Clip(audio.len()));
        }
    }
}
