use crate::action::Action;
use crate::arms::ArmBank;
use crate::binding::{evaluate, DeviceState};
use crate::config::TeleopConfig;
use crate::dispatch::MotionDispatcher;
use crate::input::InputDevice;
use crate::mode::{ControlMode, ModeMachine, Transition};
use crate::notify::{Notifier, Sound};
use crate::preset::apply_preset;
use crate::synth::{finalize, synthesize, ArmVelocities, JogSpeeds};
use crate::worker::{VisionWorker, WorkerContext};
use crate::{Result, TeleopError};
use arm_link::{try_lock_arm, ArmError, ArmSide, Pose6D, SharedArm};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};
use vision_grasp::VisionRig;
use voice_link::{AudioRecorder, VoiceClient};

/// What one control tick did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickReport {
    pub mode: ControlMode,
    pub velocities: ArmVelocities,
    /// Robot calls accepted by the jog path.
    pub calls: usize,
}

/// The teleoperation loop body: input to mode handling, events and per-tick motion.
pub struct TeleopController {
    config: TeleopConfig,
    modes: ModeMachine,
    arms: ArmBank,
    dispatcher: MotionDispatcher,
    speeds: JogSpeeds,
    worker: VisionWorker,
    recorder: Box<dyn AudioRecorder + Send>,
    notifier: Arc<dyn Notifier>,
    /// Previous activation of each binding, for press edges.
    latched: Vec<bool>,
}

impl TeleopController {
    pub fn new(
        config: TeleopConfig,
        rig: VisionRig,
        recorder: Box<dyn AudioRecorder + Send>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let s = &config.settings;
        let modes = ModeMachine::new(s.long_press());
        let dispatcher = MotionDispatcher {
            stream: s.stream_profile(),
            jog_deadband: s.jog_deadband,
            max_speed: s.max_speed,
        };
        let speeds = JogSpeeds {
            xy: s.initial_speed_xy,
            z: s.initial_speed_z,
            rpy: s.rpy_speed,
        };
        let worker = VisionWorker::new(WorkerContext {
            rig: Arc::new(Mutex::new(rig)),
            client: VoiceClient::new(config.voice.clone()),
            settings: config.vision.clone(),
            notifier: notifier.clone(),
            mode: modes.shared(),
        });
        let latched = vec![false; config.bindings.len()];
        Self {
            config,
            modes,
            arms: ArmBank::new(),
            dispatcher,
            speeds,
            worker,
            recorder,
            notifier,
            latched,
        }
    }

    /// Bring an arm up; a ready arm also becomes available to the grasp pipeline.
    pub fn attach_arm(&mut self, side: ArmSide, arm: SharedArm) -> bool {
        let ok = self.arms.attach(side, arm.clone());
        if ok {
            match self.worker.rig().lock() {
                Ok(mut rig) => rig.insert_arm(side, arm),
                Err(_) => warn!(arm = %side, "vision rig lock poisoned; arm not registered"),
            }
        }
        ok
    }

    pub fn mode(&self) -> ControlMode {
        self.modes.mode()
    }

    pub fn speeds(&self) -> JogSpeeds {
        self.speeds
    }

    pub fn arms(&self) -> &ArmBank {
        &self.arms
    }

    pub fn worker(&self) -> &VisionWorker {
        &self.worker
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    /// One control cycle.
    pub fn tick(&mut self, state: &DeviceState, now: Instant) -> TickReport {
        let mut pressed = Vec::new();
        let mut switch_held = false;
        for (i, (action, binding)) in self.config.bindings.iter().enumerate() {
            if action.is_jog() {
                continue;
            }
            let active = evaluate(binding, state).active;
            if *action == Action::ModeSwitch {
                switch_held |= active;
            } else if active && !self.latched[i] {
                pressed.push(action.clone());
            }
            self.latched[i] = active;
        }

        if let Some(tr) = self.modes.observe(switch_held, now) {
            self.on_transition(tr);
        }
        for action in pressed {
            self.on_press(&action);
        }

        let mode = self.modes.mode();
        let raw = synthesize(mode, &self.config.bindings, state, &self.speeds);
        let velocities = finalize(mode, raw, &self.config.rotation_correction);
        let mut calls = 0;
        if mode.is_jog() {
            for side in ArmSide::BOTH {
                if self.arm_busy(side) {
                    continue;
                }
                let Some(arm) = self.arms.ready(side) else {
                    continue;
                };
                let v = velocities[side.index()];
                match try_lock_arm(arm) {
                    Ok(Some(mut guard)) => {
                        calls += self.dispatcher.dispatch(&mut *guard, side, mode, &v)
                    }
                    Ok(None) => debug!(arm = %side, "arm held elsewhere; skipping tick"),
                    Err(e) => warn!(arm = %side, error = %e, "skipping tick"),
                }
                self.arms.state_mut(side).commanded = v;
            }
        }
        TickReport {
            mode,
            velocities,
            calls,
        }
    }

    /// Tick at the configured rate until the device ends or `stop` is set.
    pub fn run(&mut self, input: &mut dyn InputDevice, stop: &AtomicBool) -> u64 {
        let period = self.config.settings.tick_period();
        let mut ticks = 0;
        info!(hz = self.config.settings.loop_hz, "control loop started");
        while !stop.load(Ordering::SeqCst) {
            let started = Instant::now();
            let Some(state) = input.poll() else {
                info!("input device finished");
                break;
            };
            self.tick(&state, started);
            ticks += 1;
            if let Some(rest) = period.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }
        input.close();
        info!(ticks, "control loop stopped");
        ticks
    }

    /// Whether the vision worker is driving `side`.
    fn arm_busy(&self, side: ArmSide) -> bool {
        self.worker.busy_arm() == Some(side)
    }

    fn on_transition(&mut self, tr: Transition) {
        self.arms
            .stop_all(&self.config.settings.stop_profile(), self.worker.busy_arm());
        if tr.from == ControlMode::VisionGuided {
            if self.recorder.cancel() {
                self.notifier.sound(Sound::VisionRecordCancel);
            }
            self.worker.cancel();
        }
        self.notifier.sound(tr.to.entry_sound());
        self.notifier.status(&format!("mode: {}", tr.to));
    }

    fn on_press(&mut self, action: &Action) {
        let mode = self.modes.mode();
        debug!(%action, %mode, "control pressed");
        match action {
            Action::SpeedIncrease | Action::SpeedDecrease if mode.is_jog() => {
                let s = &self.config.settings;
                let delta = if *action == Action::SpeedIncrease {
                    s.speed_increment
                } else {
                    -s.speed_increment
                };
                self.speeds.xy = (self.speeds.xy + delta).clamp(s.min_speed, s.max_speed);
                self.speeds.z = (self.speeds.z + delta).clamp(s.min_speed, s.max_speed);
                self.notifier.sound(Sound::SpeedChangeConfirm);
                self.notifier.status(&format!(
                    "speed xy {:.0} z {:.0}",
                    self.speeds.xy, self.speeds.z
                ));
            }
            Action::GripperToggle(side) if self.arm_busy(*side) => {
                debug!(arm = %side, "gripper toggle refused during grasp");
                self.notifier.sound(Sound::ActionFailGeneral);
                self.notifier
                    .status(&format!("{side} arm is busy with a grasp"));
            }
            Action::GripperToggle(side) => {
                let motion = self.config.settings.gripper_motion();
                self.arms
                    .toggle_gripper(*side, &motion, self.notifier.as_ref());
            }
            Action::Preset { arm, key } if mode == ControlMode::PosePreset => {
                if let Err(e) = self.apply_named_preset(*arm, key) {
                    debug!(%arm, preset = %key, error = %e, "preset not applied");
                }
            }
            Action::VisionStartRecord if mode == ControlMode::VisionGuided => self.start_recording(),
            Action::VisionStopRecordConfirm if mode == ControlMode::VisionGuided => {
                self.stop_recording_and_submit()
            }
            Action::VisionCancelRecord if mode == ControlMode::VisionGuided => {
                if self.recorder.cancel() {
                    self.notifier.sound(Sound::VisionRecordCancel);
                    self.notifier.status("recording cancelled");
                } else {
                    self.notifier.status("no recording to cancel");
                }
            }
            _ => {}
        }
    }

    /// Look up a preset and apply it to one arm, with feedback.
    pub fn apply_named_preset(&mut self, arm: ArmSide, key: &str) -> Result<Pose6D> {
        let (ok_sound, fail_sound) = match arm {
            ArmSide::Left => (Sound::LeftResetSuccess, Sound::LeftResetFail),
            ArmSide::Right => (Sound::RightResetSuccess, Sound::RightResetFail),
        };
        let outcome = self.try_preset(arm, key);
        match &outcome {
            Ok(target) => {
                self.notifier.sound(ok_sound);
                self.notifier
                    .status(&format!("{arm} arm set to {key} {:?}", target.rpy()));
            }
            Err(e) => {
                warn!(%arm, preset = key, error = %e, "preset failed");
                self.notifier.sound(fail_sound);
                self.notifier.status(&format!("{arm} preset {key} failed: {e}"));
                if matches!(e, TeleopError::Arm(ArmError::Motion(_))) {
                    self.arms
                        .stop_all(&self.config.settings.stop_profile(), self.worker.busy_arm());
                }
            }
        }
        outcome
    }

    fn try_preset(&self, arm: ArmSide, key: &str) -> Result<Pose6D> {
        let rpy = self.config.presets.lookup(arm, key)?;
        let handle = self.arms.require(arm)?;
        if self.arm_busy(arm) {
            return Err(TeleopError::ArmBusy(arm));
        }
        let mut guard = try_lock_arm(handle)?.ok_or(TeleopError::ArmBusy(arm))?;
        Ok(apply_preset(
            &mut *guard,
            rpy,
            self.config.settings.reset_rpy_speed,
        )?)
    }

    fn start_recording(&mut self) {
        if self.recorder.is_recording() {
            self.notifier.sound(Sound::AlreadyRecordingError);
            self.notifier.status("already recording");
            return;
        }
        self.notifier.sound(Sound::VisionRecordStart);
        match self.recorder.start() {
            Ok(()) => self
                .notifier
                .status("recording; confirm to send, cancel to discard"),
            Err(e) => {
                warn!(error = %e, "recording failed to start");
                self.notifier.sound(Sound::ActionFailGeneral);
                self.notifier.status(&format!("recording failed: {e}"));
            }
        }
    }

    fn stop_recording_and_submit(&mut self) {
        if !self.recorder.is_recording() {
            self.notifier.sound(Sound::NotRecordingError);
            self.notifier.status("not recording");
            return;
        }
        self.notifier.sound(Sound::VisionRecordStop);
        let submitted = self
            .recorder
            .stop()
            .map_err(TeleopError::from)
            .and_then(|clip| self.worker.submit(clip));
        match submitted {
            Ok(job) => self.notifier.status(&format!("processing voice command {job}")),
            Err(e) => {
                warn!(error = %e, "voice command not submitted");
                self.notifier.sound(Sound::ActionFailGeneral);
                self.notifier.status(&format!("voice command not sent: {e}"));
            }
        }
    }

    /// Stop motion, end the worker, close cameras and disconnect arms.
    pub fn shutdown(&mut self) {
        info!("shutting down");
        let profile = self.config.settings.stop_profile();
        let busy = self.worker.busy_arm();
        self.arms.stop_all(&profile, busy);
        self.recorder.cancel();
        self.worker.cancel();
        if let Some(outcome) = self.worker.wait() {
            debug!(?outcome, "vision job ended during shutdown");
        }
        if busy.is_some() {
            self.arms.stop_all(&profile, None);
        }
        match self.worker.rig().lock() {
            Ok(mut rig) => rig.close_cameras(),
            Err(_) => warn!("vision rig lock poisoned; cameras left open"),
        }
        self.arms.disconnect_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemoryNotifier;
    use arm_link::frames::rotation_from_rpy;
    use arm_link::{ArmCall, MockArm};
    use std::time::Duration;
    use voice_link::MockRecorder;

    const CONFIG: &str = r#"
settings:
  long_press_duration: 0.8
voice:
  server_addr: "127.0.0.1:9"
  connect_timeout_s: 0.2
  recv_timeout_s: 0.2
controls:
  xyz_left_arm_x_pos: {type: axis, index: 0, direction: 1}
  xyz_left_arm_x_neg: {type: axis, index: 0, direction: -1}
  rpy_right_arm_yaw_pos: {type: axis, index: 1, direction: 1}
  reset_left_arm_up_rpy: {type: button, index: 2}
  reset_left_arm_sideways_rpy: {type: button, index: 3}
  vision_start_record: {type: button, index: 4}
  vision_stop_record_confirm: {type: button, index: 5}
  vision_cancel_record: {type: button, index: 8}
reset_rpy_poses:
  left_up: [90.0, 0.0, 180.0]
  left_sideways: [90.0, 0.0]
"#;

    struct Harness {
        ctl: TeleopController,
        notes: Arc<MemoryNotifier>,
        left: Arc<Mutex<MockArm>>,
        right: Arc<Mutex<MockArm>>,
        t: Instant,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_config(CONFIG)
        }

        fn with_voice(addr: &str) -> Self {
            Self::with_config(&CONFIG.replace("127.0.0.1:9\"", &format!("{addr}\"")))
        }

        fn with_config(yaml: &str) -> Self {
            let cfg = TeleopConfig::from_yaml_str(yaml).unwrap();
            let notes = Arc::new(MemoryNotifier::new());
            let mut ctl = TeleopController::new(
                cfg,
                VisionRig::new(),
                Box::new(MockRecorder::new(16_000, 100)),
                notes.clone(),
            );
            let left = Arc::new(Mutex::new(MockArm::new(ArmSide::Left)));
            let right = Arc::new(Mutex::new(MockArm::new(ArmSide::Right)));
            assert!(ctl.attach_arm(ArmSide::Left, left.clone()));
            assert!(ctl.attach_arm(ArmSide::Right, right.clone()));
            left.lock().unwrap().clear_calls();
            right.lock().unwrap().clear_calls();
            Self {
                ctl,
                notes,
                left,
                right,
                t: Instant::now(),
            }
        }

        fn step(&mut self, state: &DeviceState) -> TickReport {
            self.t += Duration::from_millis(33);
            self.ctl.tick(state, self.t)
        }

        fn press(&mut self, button: usize) {
            let mut down = DeviceState {
                buttons: vec![false; 11],
                ..Default::default()
            };
            down.buttons[button] = true;
            self.step(&down);
            self.step(&DeviceState::default());
        }

        fn switch_to(&mut self, mode: ControlMode) {
            while self.ctl.mode() != mode {
                self.press(7);
            }
            self.notes.clear();
            self.left.lock().unwrap().clear_calls();
            self.right.lock().unwrap().clear_calls();
        }
    }

    /// Answer one clip with `reply` on an ephemeral port.
    fn serve(reply: serde_json::Value) -> String {
        let (tx, rx) = std::sync::mpsc::channel();
        thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                let server = voice_link::CommandServer::bind("127.0.0.1:0", Some(reply), Vec::new())
                    .await
                    .unwrap();
                tx.send(server.local_addr().unwrap()).unwrap();
                let _ = server.serve_one().await;
            });
        });
        rx.recv_timeout(Duration::from_secs(5)).unwrap().to_string()
    }

    fn closed_gripper(arm: &Mutex<MockArm>) -> bool {
        arm.lock()
            .unwrap()
            .calls()
            .iter()
            .any(|c| matches!(c, ArmCall::CloseGripper(_)))
    }

    fn axes(values: &[f64]) -> DeviceState {
        DeviceState {
            axes: values.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn tap_switches_mode_and_stops_arms() {
        let mut h = Harness::new();
        h.press(7);
        assert_eq!(h.ctl.mode(), ControlMode::OrientationJog);
        assert_eq!(h.notes.sounds(), vec![Sound::RpyMode]);
        assert!(h.left.lock().unwrap().velocities().iter().all(|v| v.is_zero()));
        assert!(!h.right.lock().unwrap().velocities().is_empty());
    }

    #[test]
    fn held_switch_does_not_cycle() {
        let mut h = Harness::new();
        let down = DeviceState {
            buttons: vec![false, false, false, false, false, false, false, true],
            ..Default::default()
        };
        for _ in 0..30 {
            h.step(&down);
        }
        h.step(&DeviceState::default());
        assert_eq!(h.ctl.mode(), ControlMode::CartesianJog);
    }

    #[test]
    fn cartesian_jog_dispatches_corrected_velocity() {
        let mut h = Harness::new();
        let report = h.step(&axes(&[0.5]));
        assert_eq!(report.calls, 2);
        let r = rotation_from_rpy([65.0, 0.0, 10.0]);
        let sent = h.left.lock().unwrap().velocities()[0];
        for j in 0..3 {
            assert!((sent.0[j] - 20.0 * r[(0, j)]).abs() < 1e-9);
        }
        assert_eq!(sent.angular(), [0.0; 3]);
        assert!(h.right.lock().unwrap().velocities()[0].is_zero());
        assert_eq!(h.ctl.arms().state(ArmSide::Left).commanded, sent);
    }

    #[test]
    fn orientation_jog_pulses() {
        let mut h = Harness::new();
        h.switch_to(ControlMode::OrientationJog);
        h.step(&axes(&[0.0, 1.0]));
        assert_eq!(h.right.lock().unwrap().jogs(), vec![(10, 20.0)]);
        assert!(h.left.lock().unwrap().jogs().is_empty());
    }

    #[test]
    fn speed_buttons_only_in_jog_modes() {
        let mut h = Harness::new();
        for _ in 0..20 {
            h.press(1);
        }
        assert_eq!(h.ctl.speeds().xy, 100.0);
        assert_eq!(h.ctl.speeds().z, 100.0);
        h.switch_to(ControlMode::PosePreset);
        h.press(6);
        assert_eq!(h.ctl.speeds().xy, 100.0);
        assert!(h.notes.sounds().is_empty());
    }

    #[test]
    fn preset_button_moves_once() {
        let mut h = Harness::new();
        h.press(2);
        assert!(h.left.lock().unwrap().p2p_moves().is_empty());

        h.switch_to(ControlMode::PosePreset);
        h.press(2);
        let moves = h.left.lock().unwrap().p2p_moves();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].rpy(), [90.0, 0.0, 180.0]);
        assert_eq!(h.notes.sounds(), vec![Sound::LeftResetSuccess]);
    }

    #[test]
    fn malformed_preset_is_not_a_motion() {
        let mut h = Harness::new();
        h.switch_to(ControlMode::PosePreset);
        assert!(matches!(
            h.ctl.apply_named_preset(ArmSide::Left, "left_sideways"),
            Err(TeleopError::InvalidPreset(_))
        ));
        assert!(h.left.lock().unwrap().calls().is_empty());
        assert_eq!(h.notes.sounds(), vec![Sound::LeftResetFail]);

        let target = h
            .ctl
            .apply_named_preset(ArmSide::Right, "right_default")
            .unwrap();
        assert_eq!(target.rpy(), [180.0, 0.0, 0.0]);
    }

    #[test]
    fn failed_preset_button_reports_and_does_not_move() {
        let mut h = Harness::new();
        h.switch_to(ControlMode::PosePreset);
        h.press(3);
        assert!(h.left.lock().unwrap().p2p_moves().is_empty());
        assert_eq!(h.notes.sounds(), vec![Sound::LeftResetFail]);
    }

    #[test]
    fn gripper_toggle_never_waits_on_a_held_arm() {
        let mut h = Harness::new();
        h.switch_to(ControlMode::VisionGuided);
        let left = h.left.clone();
        let (tx, rx) = std::sync::mpsc::channel();
        let holder = thread::spawn(move || {
            let _held = left.lock().unwrap();
            tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(400));
        });
        rx.recv().unwrap();

        let started = Instant::now();
        h.press(9);
        let waited = started.elapsed();
        holder.join().unwrap();

        assert!(waited < Duration::from_millis(200), "tick waited {waited:?}");
        assert!(!closed_gripper(&h.left));
        assert!(h.ctl.arms().state(ArmSide::Left).gripper_open);
        assert_eq!(h.notes.sounds(), vec![Sound::ActionFailGeneral]);
    }

    #[test]
    fn grasping_arm_is_left_to_the_worker() {
        let addr = serve(serde_json::json!({
            "action": "grasp",
            "target": {"id": "cup", "base_coordinates_mm": [300, 100, 50], "arm_choice": "left"}
        }));
        let mut h = Harness::with_voice(&addr);
        h.switch_to(ControlMode::VisionGuided);

        // Holding the rig parks the job once it has claimed the left arm.
        let rig = h.ctl.worker().rig();
        let held = rig.lock().unwrap();
        h.press(4);
        h.press(5);
        let deadline = Instant::now() + Duration::from_secs(5);
        while h.ctl.worker().busy_arm().is_none() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(h.ctl.worker().busy_arm(), Some(ArmSide::Left));
        h.notes.clear();

        h.press(9);
        assert!(!closed_gripper(&h.left));
        assert_eq!(h.notes.sounds(), vec![Sound::ActionFailGeneral]);
        assert!(matches!(
            h.ctl.apply_named_preset(ArmSide::Left, "left_up"),
            Err(TeleopError::ArmBusy(ArmSide::Left))
        ));

        h.press(10);
        assert!(closed_gripper(&h.right));

        h.press(7);
        assert!(h.left.lock().unwrap().velocities().is_empty());
        let right = h.right.lock().unwrap().velocities();
        assert!(!right.is_empty() && right.iter().all(|v| v.is_zero()));

        drop(held);
        assert!(matches!(
            h.ctl.worker().wait(),
            Some(crate::worker::JobOutcome::Failed(_))
        ));
        assert_eq!(h.ctl.worker().busy_arm(), None);
    }

    #[test]
    fn recording_flow_and_cancel_on_mode_exit() {
        let mut h = Harness::new();
        h.switch_to(ControlMode::VisionGuided);
        h.press(5);
        h.press(4);
        h.press(4);
        assert!(h.ctl.is_recording());
        assert_eq!(
            h.notes.sounds(),
            vec![
                Sound::NotRecordingError,
                Sound::VisionRecordStart,
                Sound::AlreadyRecordingError
            ]
        );
        h.notes.clear();
        h.press(7);
        assert!(!h.ctl.is_recording());
        assert_eq!(
            h.notes.sounds(),
            vec![Sound::VisionRecordCancel, Sound::XyzMode]
        );
    }

    #[test]
    fn confirmed_clip_goes_to_the_worker() {
        let mut h = Harness::new();
        h.switch_to(ControlMode::VisionGuided);
        h.press(4);
        h.press(5);
        assert!(!h.ctl.is_recording());
        // Nothing listens on the discard port, so the job fails.
        assert!(matches!(
            h.ctl.worker().wait(),
            Some(crate::worker::JobOutcome::Failed(_))
        ));
        let sounds = h.notes.sounds();
        assert_eq!(&sounds[..2], &[Sound::VisionRecordStart, Sound::VisionRecordStop]);
        assert_eq!(sounds.last(), Some(&Sound::ActionFailGeneral));
    }

    #[test]
    fn shutdown_disconnects() {
        let mut h = Harness::new();
        h.ctl.shutdown();
        for arm in [&h.left, &h.right] {
            let calls = arm.lock().unwrap().calls().to_vec();
            assert_eq!(calls.last(), Some(&ArmCall::Disconnect));
        }
        assert!(!h.ctl.arms().state(ArmSide::Left).initialized);
    }

    #[test]
    fn run_consumes_the_device() {
        let mut h = Harness::new();
        let src = "{\"axes\":[1.0]}\n{\"axes\":[0.0]}\n{\"axes\":[-1.0]}\n";
        let mut dev = crate::input::ReplayDevice::from_reader(src.as_bytes()).unwrap();
        let stop = AtomicBool::new(false);
        assert_eq!(h.ctl.run(&mut dev, &stop), 3);
        assert_eq!(h.left.lock().unwrap().velocities().len(), 3);
    }
}
