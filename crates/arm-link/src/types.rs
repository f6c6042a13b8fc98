use core::fmt;
use serde::{Deserialize, Serialize};

/// Which of the two arms a command or setting belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArmSide {
    Left,
    Right,
}

impl ArmSide {
    pub const BOTH: [ArmSide; 2] = [ArmSide::Left, ArmSide::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArmSide::Left => "left",
            ArmSide::Right => "right",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "left" => Some(ArmSide::Left),
            "right" => Some(ArmSide::Right),
            _ => None,
        }
    }

    /// Index into two-element per-arm arrays.
    pub fn index(&self) -> usize {
        match self {
            ArmSide::Left => 0,
            ArmSide::Right => 1,
        }
    }
}

impl fmt::Display for ArmSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tool pose in an arm's base frame: millimetres and degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose6D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Pose6D {
    pub fn new(x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        Self {
            x,
            y,
            z,
            roll,
            pitch,
            yaw,
        }
    }

    pub fn from_parts(xyz: [f64; 3], rpy: [f64; 3]) -> Self {
        Self::new(xyz[0], xyz[1], xyz[2], rpy[0], rpy[1], rpy[2])
    }

    pub fn from_array(v: [f64; 6]) -> Self {
        Self::new(v[0], v[1], v[2], v[3], v[4], v[5])
    }

    pub fn to_array(&self) -> [f64; 6] {
        [self.x, self.y, self.z, self.roll, self.pitch, self.yaw]
    }

    pub fn translation(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn rpy(&self) -> [f64; 3] {
        [self.roll, self.pitch, self.yaw]
    }

    /// Same position, new orientation.
    pub fn with_rpy(&self, rpy: [f64; 3]) -> Self {
        Self::from_parts(self.translation(), rpy)
    }

    /// Shifted along the base z axis.
    pub fn raised(&self, dz_mm: f64) -> Self {
        Self {
            z: self.z + dz_mm,
            ..*self
        }
    }
}

/// Six signed velocity components: linear x/y/z then angular roll/pitch/yaw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity6D(pub [f64; 6]);

impl Velocity6D {
    pub const ZERO: Velocity6D = Velocity6D([0.0; 6]);

    pub fn linear(&self) -> [f64; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    pub fn angular(&self) -> [f64; 3] {
        [self.0[3], self.0[4], self.0[5]]
    }

    pub fn set_linear(&mut self, v: [f64; 3]) {
        self.0[..3].copy_from_slice(&v);
    }

    pub fn set_angular(&mut self, v: [f64; 3]) {
        self.0[3..].copy_from_slice(&v);
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|c| *c == 0.0)
    }
}

/// Acceleration and refresh window for a streamed Cartesian velocity command.
/// The controller lets the velocity decay once `time_slice_s` passes without a refresh.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VelocityProfile {
    pub acc: f64,
    pub arot: f64,
    pub time_slice_s: f64,
}

impl VelocityProfile {
    pub fn new(acc: f64, arot: f64, time_slice_s: f64) -> Self {
        Self {
            acc,
            arot,
            time_slice_s,
        }
    }
}

/// One of the twelve discrete jog directions (+/- for each of six DOF).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct JogAxis(u8);

impl JogAxis {
    pub fn new(index: u8) -> Option<Self> {
        if index < 12 {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Component `k` (0..6) of a velocity vector; positive maps to `2k`, negative to `2k + 1`.
    pub fn for_component(k: usize, positive: bool) -> Option<Self> {
        if k >= 6 {
            return None;
        }
        let base = (k * 2) as u8;
        Self::new(if positive { base } else { base + 1 })
    }

    pub fn index(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for JogAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 6] = ["x", "y", "z", "rx", "ry", "rz"];
        let sign = if self.0 % 2 == 0 { '+' } else { '-' };
        write!(f, "{}{}", NAMES[(self.0 / 2) as usize], sign)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GripperMotion {
    pub speed: u32,
    pub force: u32,
    pub wait: bool,
}
