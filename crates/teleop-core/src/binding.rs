//! Declarative input bindings and their evaluation against a device snapshot.

use serde::{Deserialize, Serialize};

pub const DEFAULT_TRIGGER_THRESHOLD: f64 = 0.1;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    Button,
    Axis,
    Hat,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HatAxis {
    #[default]
    X,
    Y,
}

/// How one piece of hardware state is read as a logical control.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputBinding {
    #[serde(rename = "type")]
    pub kind: BindingKind,
    pub index: i32,
    /// Axis deflection that must be exceeded; filled from the global trigger threshold at load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// `1` or `-1`; for hats the required discrete value.
    #[serde(default = "default_direction")]
    pub direction: i8,
    #[serde(default, alias = "axis")]
    pub hat_axis: HatAxis,
}

fn default_direction() -> i8 {
    1
}

impl InputBinding {
    pub fn button(index: i32) -> Self {
        Self {
            kind: BindingKind::Button,
            index,
            threshold: None,
            direction: 1,
            hat_axis: HatAxis::X,
        }
    }

    pub fn axis(index: i32, direction: i8, threshold: f64) -> Self {
        Self {
            kind: BindingKind::Axis,
            index,
            threshold: Some(threshold),
            direction,
            hat_axis: HatAxis::X,
        }
    }

    pub fn hat(index: i32, hat_axis: HatAxis, direction: i8) -> Self {
        Self {
            kind: BindingKind::Hat,
            index,
            threshold: None,
            direction,
            hat_axis,
        }
    }
}

/// One poll of the input device.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceState {
    pub buttons: Vec<bool>,
    pub axes: Vec<f64>,
    pub hats: Vec<[i8; 2]>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Activation {
    pub active: bool,
    /// `0..=1`; always 1 for active buttons and hats.
    pub magnitude: f64,
}

impl Activation {
    pub const OFF: Activation = Activation {
        active: false,
        magnitude: 0.0,
    };

    fn on(magnitude: f64) -> Self {
        Self {
            active: true,
            magnitude,
        }
    }
}

/// Read `binding` from `state`. Indices outside the device are inactive.
pub fn evaluate(binding: &InputBinding, state: &DeviceState) -> Activation {
    let Ok(idx) = usize::try_from(binding.index) else {
        return Activation::OFF;
    };
    match binding.kind {
        BindingKind::Button => match state.buttons.get(idx) {
            Some(true) => Activation::on(1.0),
            _ => Activation::OFF,
        },
        BindingKind::Axis => {
            let Some(&value) = state.axes.get(idx) else {
                return Activation::OFF;
            };
            let threshold = binding.threshold.unwrap_or(DEFAULT_TRIGGER_THRESHOLD);
            let active = match binding.direction {
                d if d > 0 => value > threshold,
                d if d < 0 => value < -threshold,
                _ => false,
            };
            if active {
                Activation::on(value.abs().min(1.0))
            } else {
                Activation::OFF
            }
        }
        BindingKind::Hat => {
            let Some(hat) = state.hats.get(idx) else {
                return Activation::OFF;
            };
            let value = match binding.hat_axis {
                HatAxis::X => hat[0],
                HatAxis::Y => hat[1],
            };
            if value == binding.direction {
                Activation::on(1.0)
            } else {
                Activation::OFF
            }
        }
    }
}
