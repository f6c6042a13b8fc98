use crate::{LinkError, Result};
use std::io::Cursor;

/// Push-to-talk audio capture producing a WAV clip.
pub trait AudioRecorder {
    fn start(&mut self) -> Result<()>;
    /// Finish the take and return the encoded WAV.
    fn stop(&mut self) -> Result<Vec<u8>>;
    /// Drop the current take. Returns whether one was in progress.
    fn cancel(&mut self) -> bool;
    fn is_recording(&self) -> bool;
}

/// Length of a WAV clip in milliseconds.
pub fn wav_duration_ms(bytes: &[u8]) -> Result<u64> {
    let reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| LinkError::Audio(e.to_string()))?;
    let rate = u64::from(reader.spec().sample_rate.max(1));
    Ok(u64::from(reader.duration()) * 1000 / rate)
}

#[cfg(feature = "mock")]
pub use mock::MockRecorder;

#[cfg(feature = "mock")]
mod mock {
    use super::*;

    /// Recorder that "captures" a 440 Hz tone lasting `take_ms`.
    pub struct MockRecorder {
        sample_rate_hz: u32,
        take_ms: u32,
        recording: bool,
    }

    impl MockRecorder {
        pub fn new(sample_rate_hz: u32, take_ms: u32) -> Self {
            Self {
                sample_rate_hz: sample_rate_hz.max(8000),
                take_ms,
                recording: false,
            }
        }

        fn encode(&self) -> Result<Vec<u8>> {
            let spec = hound::WavSpec {
                channels: 1,
                sample_rate: self.sample_rate_hz,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let frames = (u64::from(self.sample_rate_hz) * u64::from(self.take_ms) / 1000) as usize;
            let mut buf = Vec::new();
            {
                let mut writer = hound::WavWriter::new(Cursor::new(&mut buf), spec)
                    .map_err(|e| LinkError::Audio(e.to_string()))?;
                for n in 0..frames {
                    let t = n as f32 / self.sample_rate_hz as f32;
                    let s = (2.0 * std::f32::consts::PI * 440.0 * t).sin();
                    writer
                        .write_sample((s * 3000.0) as i16)
                        .map_err(|e| LinkError::Audio(e.to_string()))?;
                }
                writer
                    .finalize()
                    .map_err(|e| LinkError::Audio(e.to_string()))?;
            }
            Ok(buf)
        }
    }

    impl Default for MockRecorder {
        fn default() -> Self {
            Self::new(16_000, 1_000)
        }
    }

    impl AudioRecorder for MockRecorder {
        fn start(&mut self) -> Result<()> {
            if self.recording {
                return Err(LinkError::AlreadyRecording);
            }
            self.recording = true;
            Ok(())
        }

        fn stop(&mut self) -> Result<Vec<u8>> {
            if !self.recording {
                return Err(LinkError::NotRecording);
            }
            self.recording = false;
            self.encode()
        }

        fn cancel(&mut self) -> bool {
            std::mem::replace(&mut self.recording, false)
        }

        fn is_recording(&self) -> bool {
            self.recording
        }
    }
}
