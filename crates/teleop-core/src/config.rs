//! YAML configuration, resolved once into typed tables.

use crate::action::{Action, BindingTable};
use crate::binding::{InputBinding, DEFAULT_TRIGGER_THRESHOLD};
use crate::{Result, TeleopError};
use anyhow::Context;
use arm_link::{ArmSide, GripperMotion, VelocityProfile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vision_grasp::GraspSettings;
use voice_link::VoiceClientConfig;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupConfig {
    pub left_robot_ip: String,
    pub right_robot_ip: String,
    pub left_gripper_id: u32,
    pub right_gripper_id: u32,
    /// Camera name (`left_hand`, `right_hand`) to device serial.
    pub camera_serials: BTreeMap<String, String>,
    /// Object id to detector model path; `default` serves unknown objects.
    pub yolo_models: BTreeMap<String, PathBuf>,
    /// `left` / `right` to hand-eye calibration YAML.
    pub calibration_files: BTreeMap<String, PathBuf>,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            left_robot_ip: "127.0.0.1".to_string(),
            right_robot_ip: "127.0.0.1".to_string(),
            left_gripper_id: 9,
            right_gripper_id: 9,
            camera_serials: BTreeMap::new(),
            yolo_models: BTreeMap::new(),
            calibration_files: BTreeMap::new(),
        }
    }
}

impl SetupConfig {
    pub fn robot_ip(&self, arm: ArmSide) -> &str {
        match arm {
            ArmSide::Left => &self.left_robot_ip,
            ArmSide::Right => &self.right_robot_ip,
        }
    }

    pub fn calibration_file(&self, arm: ArmSide) -> Option<&Path> {
        self.calibration_files.get(arm.as_str()).map(PathBuf::as_path)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub initial_speed_xy: f64,
    pub initial_speed_z: f64,
    pub rpy_speed: f64,
    pub speed_increment: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    pub acc: f64,
    pub arot: f64,
    pub t_interval: f64,
    pub reset_rpy_speed: f64,
    pub gripper_speed: u32,
    pub gripper_force: u32,
    /// Seconds.
    pub long_press_duration: f64,
    pub trigger_threshold: f64,
    pub loop_hz: f64,
    pub jog_deadband: f64,
    pub stop_acc: f64,
    pub stop_arot: f64,
    pub stop_t: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            initial_speed_xy: 40.0,
            initial_speed_z: 30.0,
            rpy_speed: 20.0,
            speed_increment: 5.0,
            min_speed: 5.0,
            max_speed: 100.0,
            acc: 100.0,
            arot: 10.0,
            t_interval: 0.1,
            reset_rpy_speed: 30.0,
            gripper_speed: 150,
            gripper_force: 100,
            long_press_duration: 0.8,
            trigger_threshold: DEFAULT_TRIGGER_THRESHOLD,
            loop_hz: 30.0,
            jog_deadband: 0.05,
            stop_acc: 200.0,
            stop_arot: 20.0,
            stop_t: 0.05,
        }
    }
}

impl Settings {
    pub fn stream_profile(&self) -> VelocityProfile {
        VelocityProfile::new(self.acc, self.arot, self.t_interval)
    }

    pub fn stop_profile(&self) -> VelocityProfile {
        VelocityProfile::new(self.stop_acc, self.stop_arot, self.stop_t)
    }

    /// Manual gripper toggles do not wait for the motion to finish.
    pub fn gripper_motion(&self) -> GripperMotion {
        GripperMotion {
            speed: self.gripper_speed,
            force: self.gripper_force,
            wait: false,
        }
    }

    pub fn long_press(&self) -> Duration {
        Duration::try_from_secs_f64(self.long_press_duration).unwrap_or_default()
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.loop_hz)
    }
}

/// Per-arm mounting correction for translation jogs, Euler `xyz` degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationCorrection {
    pub left: [f64; 3],
    pub right: [f64; 3],
}

impl Default for RotationCorrection {
    fn default() -> Self {
        Self {
            left: [65.0, 0.0, 10.0],
            right: [65.334, -4.208, -9.079],
        }
    }
}

impl RotationCorrection {
    pub fn for_arm(&self, arm: ArmSide) -> [f64; 3] {
        match arm {
            ArmSide::Left => self.left,
            ArmSide::Right => self.right,
        }
    }
}

/// Named orientation presets (`left_forward`, ...), validated when used.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PresetTable {
    entries: BTreeMap<String, Vec<f64>>,
}

impl PresetTable {
    pub fn new(entries: BTreeMap<String, Vec<f64>>) -> Self {
        Self { entries }
    }

    pub fn default_rpy(arm: ArmSide) -> [f64; 3] {
        match arm {
            ArmSide::Left => [180.0, 0.0, 180.0],
            ArmSide::Right => [180.0, 0.0, 0.0],
        }
    }

    /// RPY for `key`. `<arm>_default` falls back to the built-in orientation.
    pub fn lookup(&self, arm: ArmSide, key: &str) -> Result<[f64; 3]> {
        match self.entries.get(key) {
            Some(v) => <[f64; 3]>::try_from(v.as_slice())
                .ok()
                .filter(|rpy| rpy.iter().all(|a| a.is_finite()))
                .ok_or_else(|| TeleopError::InvalidPreset(key.to_string())),
            None if key == format!("{arm}_default") => Ok(Self::default_rpy(arm)),
            None => Err(TeleopError::InvalidPreset(key.to_string())),
        }
    }
}

/// The file layout.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub setup: SetupConfig,
    pub settings: Settings,
    pub rotation_correction: RotationCorrection,
    pub vision: GraspSettings,
    pub voice: VoiceClientConfig,
    pub controls: BTreeMap<String, InputBinding>,
    pub audio_files: BTreeMap<String, String>,
    pub reset_rpy_poses: BTreeMap<String, Vec<f64>>,
}

/// Validated configuration with bindings resolved to actions.
#[derive(Clone, Debug)]
pub struct TeleopConfig {
    pub setup: SetupConfig,
    pub settings: Settings,
    pub rotation_correction: RotationCorrection,
    pub vision: GraspSettings,
    pub voice: VoiceClientConfig,
    pub bindings: BindingTable,
    pub audio_files: BTreeMap<String, String>,
    pub presets: PresetTable,
}

fn default_controls() -> BTreeMap<String, InputBinding> {
    [
        ("mode_switch", 7),
        ("speed_increase", 1),
        ("speed_decrease", 6),
        ("gripper_toggle_left", 9),
        ("gripper_toggle_right", 10),
    ]
    .into_iter()
    .map(|(name, idx)| (name.to_string(), InputBinding::button(idx)))
    .collect()
}

impl TeleopConfig {
    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        let file: ConfigFile = serde_yaml::from_str(raw).context("decoding configuration")?;
        Ok(Self::resolve(file)?)
    }

    pub fn resolve(file: ConfigFile) -> Result<Self> {
        validate(&file)?;
        let mut controls = default_controls();
        controls.extend(file.controls);

        let mut bindings = BindingTable::new();
        for (name, mut binding) in controls {
            let Some(action) = Action::parse(&name) else {
                tracing::warn!(control = %name, "unknown control name ignored");
                continue;
            };
            binding
                .threshold
                .get_or_insert(file.settings.trigger_threshold);
            bindings.push(action, binding);
        }
        tracing::debug!(bindings = bindings.len(), "controls resolved");

        Ok(Self {
            setup: file.setup,
            settings: file.settings,
            rotation_correction: file.rotation_correction,
            vision: file.vision,
            voice: file.voice,
            bindings,
            audio_files: file.audio_files,
            presets: PresetTable::new(file.reset_rpy_poses),
        })
    }
}

fn validate(file: &ConfigFile) -> Result<()> {
    let s = &file.settings;
    let v = &file.vision;
    let fail = |msg: String| Err(TeleopError::Config(msg));
    if !(s.min_speed > 0.0 && s.min_speed <= s.max_speed) {
        return fail(format!(
            "speed bounds must satisfy 0 < min_speed <= max_speed (got {} / {})",
            s.min_speed, s.max_speed
        ));
    }
    if !(s.loop_hz > 0.0 && s.loop_hz.is_finite()) {
        return fail(format!("loop_hz must be positive (got {})", s.loop_hz));
    }
    if !(s.long_press_duration.is_finite() && s.long_press_duration >= 0.0) {
        return fail(format!(
            "long_press_duration must be a finite, non-negative number of seconds (got {})",
            s.long_press_duration
        ));
    }
    if s.t_interval <= 0.0 || s.stop_t <= 0.0 {
        return fail("velocity time slices must be positive".to_string());
    }
    if v.post_grasp_lift_mm <= v.pre_grasp_offset_mm {
        return fail(format!(
            "post_grasp_lift_mm ({}) must exceed pre_grasp_offset_mm ({})",
            v.post_grasp_lift_mm, v.pre_grasp_offset_mm
        ));
    }
    if v.max_attempts == 0 {
        return fail("vision.max_attempts must be at least 1".to_string());
    }
    Ok(())
}

pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<TeleopConfig> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config: {}", path.display()))?;
    TeleopConfig::from_yaml_str(&raw).with_context(|| format!("loading config: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Axis, JogFamily};

    #[test]
    fn empty_file_gets_defaults() {
        let cfg = TeleopConfig::from_yaml_str("{}").unwrap();
        assert_eq!(cfg.settings.loop_hz, 30.0);
        assert_eq!(cfg.voice.server_addr, "127.0.0.1:12345");
        assert_eq!(cfg.vision.max_attempts, 2);
        assert_eq!(cfg.bindings.len(), 5);
        assert_eq!(
            cfg.bindings.find(&Action::ModeSwitch),
            Some(&InputBinding {
                threshold: Some(0.1),
                ..InputBinding::button(7)
            })
        );
    }

    #[test]
    fn controls_resolve_to_tagged_actions() {
        let cfg = TeleopConfig::from_yaml_str(
            r#"
settings:
  trigger_threshold: 0.2
controls:
  xyz_left_arm_x_pos: {type: axis, index: 0, direction: 1}
  xyz_left_arm_x_neg: {type: axis, index: 0, direction: -1, threshold: 0.3}
  mode_switch: {type: button, index: 3}
  waggle_ears: {type: button, index: 4}
"#,
        )
        .unwrap();
        let jogs: Vec<_> = cfg.bindings.jogs(JogFamily::Translation).collect();
        assert_eq!(jogs.len(), 2);
        for (arm, axis, sign, b) in jogs {
            assert_eq!(arm, ArmSide::Left);
            assert_eq!(axis, Axis::X);
            let expected = if sign > 0.0 { 0.2 } else { 0.3 };
            assert_eq!(b.threshold, Some(expected));
        }
        assert_eq!(cfg.bindings.find(&Action::ModeSwitch).map(|b| b.index), Some(3));
        // 4 remaining defaults + mode_switch + 2 jogs
        assert_eq!(cfg.bindings.len(), 7);
    }

    #[test]
    fn lift_must_exceed_approach() {
        let err = TeleopConfig::from_yaml_str(
            "vision: {pre_grasp_offset_mm: 150, post_grasp_lift_mm: 100}",
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("post_grasp_lift_mm"));
    }

    #[test]
    fn long_press_must_be_finite() {
        for bad in [".inf", ".nan", "-0.5"] {
            let err = TeleopConfig::from_yaml_str(&format!(
                "settings: {{long_press_duration: {bad}}}"
            ))
            .unwrap_err();
            assert!(format!("{err:#}").contains("long_press_duration"), "{bad}");
        }
        let cfg = TeleopConfig::from_yaml_str("settings: {long_press_duration: 0.0}").unwrap();
        assert_eq!(cfg.settings.long_press(), Duration::ZERO);
    }

    #[test]
    fn preset_lookup() {
        let mut entries = BTreeMap::new();
        entries.insert("left_up".to_string(), vec![90.0, 0.0, 180.0]);
        entries.insert("left_down".to_string(), vec![90.0, 0.0]);
        let table = PresetTable::new(entries);
        assert_eq!(table.lookup(ArmSide::Left, "left_up").unwrap(), [90.0, 0.0, 180.0]);
        assert!(matches!(
            table.lookup(ArmSide::Left, "left_down"),
            Err(TeleopError::InvalidPreset(_))
        ));
        assert!(matches!(
            table.lookup(ArmSide::Left, "left_forward"),
            Err(TeleopError::InvalidPreset(_))
        ));
        assert_eq!(
            table.lookup(ArmSide::Right, "right_default").unwrap(),
            [180.0, 0.0, 0.0]
        );
    }

    #[test]
    fn load_reports_the_path() {
        let err = load_config("/nonexistent/teleop.yaml").unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/teleop.yaml"));
    }
}
