use crate::binding::DeviceState;
use anyhow::Context;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A polled gamepad-like device.
pub trait InputDevice {
    /// Snapshot for this tick, or `None` once the device is gone.
    fn poll(&mut self) -> Option<DeviceState>;

    fn close(&mut self) {}
}

/// Replays device snapshots from newline-delimited JSON, one line per tick.
///
/// ```text
/// {"buttons": [false, true], "axes": [0.5, 0.0], "hats": [[0, 1]]}
/// ```
/// Blank lines and lines starting with `#` are skipped.
pub struct ReplayDevice {
    frames: std::vec::IntoIter<DeviceState>,
}

impl ReplayDevice {
    pub fn from_reader(reader: impl BufRead) -> anyhow::Result<Self> {
        let mut frames = Vec::new();
        for (n, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("reading replay line {}", n + 1))?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let state: DeviceState = serde_json::from_str(trimmed)
                .with_context(|| format!("parsing replay line {}", n + 1))?;
            frames.push(state);
        }
        Ok(Self {
            frames: frames.into_iter(),
        })
    }

    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("opening replay: {}", path.display()))?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl InputDevice for ReplayDevice {
    fn poll(&mut self) -> Option<DeviceState> {
        self.frames.next()
    }
}
