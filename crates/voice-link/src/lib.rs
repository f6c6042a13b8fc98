//! voice-link: voice command channel
//!
//! The client sends `"<filename>:<len>\n"` followed by `len` bytes of audio. The server
//! answers with a big-endian `u32` JSON length, the JSON command, a big-endian `u32` audio
//! length and the reply audio. Zero-length sections mean "nothing to send".

mod error;
pub use error::{LinkError, Result};

pub mod protocol;
pub use protocol::{Reply, MAX_AUDIO_LEN, MAX_JSON_LEN};

mod command;
pub use command::{interpret, GraspTarget, VoiceCommand};

mod client;
pub use client::{VoiceClient, VoiceClientConfig};

mod server;
pub use server::{CommandServer, ReceivedClip};

mod recorder;
pub use recorder::{wav_duration_ms, AudioRecorder};

#[cfg(feature = "mock")]
pub use recorder::MockRecorder;
