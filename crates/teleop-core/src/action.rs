//! Semantic actions resolved from binding names once, at configuration load.

use crate::binding::InputBinding;
use arm_link::ArmSide;
use core::fmt;

/// One of the six Cartesian degrees of freedom.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
    Roll,
    Pitch,
    Yaw,
}

impl Axis {
    /// Position in a `Velocity6D`.
    pub fn component(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
            Axis::Roll => 3,
            Axis::Pitch => 4,
            Axis::Yaw => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
            Axis::Roll => "roll",
            Axis::Pitch => "pitch",
            Axis::Yaw => "yaw",
        }
    }

    pub fn is_linear(&self) -> bool {
        self.component() < 3
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "x" => Axis::X,
            "y" => Axis::Y,
            "z" => Axis::Z,
            "roll" => Axis::Roll,
            "pitch" => Axis::Pitch,
            "yaw" => Axis::Yaw,
            _ => return None,
        })
    }
}

/// Which jog family a binding belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum JogFamily {
    Translation,
    Rotation,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    ModeSwitch,
    SpeedIncrease,
    SpeedDecrease,
    GripperToggle(ArmSide),
    Jog {
        family: JogFamily,
        arm: ArmSide,
        axis: Axis,
        /// `+1.0` or `-1.0`.
        sign: f64,
    },
    /// Key into the orientation preset table, e.g. `left_forward`.
    Preset { arm: ArmSide, key: String },
    VisionStartRecord,
    VisionStopRecordConfirm,
    VisionCancelRecord,
}

impl Action {
    /// Resolve a configured control name. `None` for names we do not know.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "mode_switch" => return Some(Action::ModeSwitch),
            "speed_increase" => return Some(Action::SpeedIncrease),
            "speed_decrease" => return Some(Action::SpeedDecrease),
            "gripper_toggle_left" => return Some(Action::GripperToggle(ArmSide::Left)),
            "gripper_toggle_right" => return Some(Action::GripperToggle(ArmSide::Right)),
            "vision_start_record" => return Some(Action::VisionStartRecord),
            "vision_stop_record_confirm" => return Some(Action::VisionStopRecordConfirm),
            "vision_cancel_record" => return Some(Action::VisionCancelRecord),
            _ => {}
        }
        if let Some(rest) = name.strip_prefix("reset_") {
            return parse_preset(rest);
        }
        parse_jog(name)
    }

    pub fn is_jog(&self) -> bool {
        matches!(self, Action::Jog { .. })
    }
}

/// `<arm>_arm_<preset>_rpy`
fn parse_preset(rest: &str) -> Option<Action> {
    let (arm, rest) = rest.split_once("_arm_")?;
    let arm = ArmSide::parse(arm)?;
    let preset = rest.strip_suffix("_rpy")?;
    if preset.is_empty() {
        return None;
    }
    Some(Action::Preset {
        arm,
        key: format!("{arm}_{preset}"),
    })
}

/// `<xyz|rpy>_<arm>_arm_<axis>_<pos|neg>`
fn parse_jog(name: &str) -> Option<Action> {
    let (family, rest) = name.split_once('_')?;
    let family = match family {
        "xyz" => JogFamily::Translation,
        "rpy" => JogFamily::Rotation,
        _ => return None,
    };
    let (arm, rest) = rest.split_once("_arm_")?;
    let arm = ArmSide::parse(arm)?;
    let (axis, sign) = rest.rsplit_once('_')?;
    let sign = match sign {
        "pos" => 1.0,
        "neg" => -1.0,
        _ => return None,
    };
    let axis = Axis::parse(axis)?;
    let family_matches = match family {
        JogFamily::Translation => axis.is_linear(),
        JogFamily::Rotation => !axis.is_linear(),
    };
    family_matches.then_some(Action::Jog {
        family,
        arm,
        axis,
        sign,
    })
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::ModeSwitch => f.write_str("mode_switch"),
            Action::SpeedIncrease => f.write_str("speed_increase"),
            Action::SpeedDecrease => f.write_str("speed_decrease"),
            Action::GripperToggle(arm) => write!(f, "gripper_toggle_{arm}"),
            Action::Jog {
                family,
                arm,
                axis,
                sign,
            } => {
                let family = match family {
                    JogFamily::Translation => "xyz",
                    JogFamily::Rotation => "rpy",
                };
                let dir = if *sign > 0.0 { "pos" } else { "neg" };
                write!(f, "{family}_{arm}_arm_{}_{dir}", axis.as_str())
            }
            Action::Preset { key, .. } => write!(f, "preset {key}"),
            Action::VisionStartRecord => f.write_str("vision_start_record"),
            Action::VisionStopRecordConfirm => f.write_str("vision_stop_record_confirm"),
            Action::VisionCancelRecord => f.write_str("vision_cancel_record"),
        }
    }
}

/// Bindings tagged with their resolved action.
#[derive(Clone, Debug, Default)]
pub struct BindingTable {
    entries: Vec<(Action, InputBinding)>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: Action, binding: InputBinding) {
        self.entries.push((action, binding));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Action, InputBinding)> {
        self.entries.iter()
    }

    /// Jog bindings of one family.
    pub fn jogs(
        &self,
        family: JogFamily,
    ) -> impl Iterator<Item = (ArmSide, Axis, f64, &InputBinding)> {
        self.entries.iter().filter_map(move |(a, b)| match a {
            Action::Jog {
                family: f,
                arm,
                axis,
                sign,
            } if *f == family => Some((*arm, *axis, *sign, b)),
            _ => None,
        })
    }

    pub fn find(&self, action: &Action) -> Option<&InputBinding> {
        self.entries
            .iter()
            .find(|(a, _)| a == action)
            .map(|(_, b)| b)
    }
}
