//! Single-slot background worker for voice-commanded grasps.

use crate::mode::{ControlMode, SharedMode};
use crate::notify::{Notifier, Sound};
use crate::{Result, TeleopError};
use arm_link::ArmSide;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;
use vision_grasp::{CancelFlag, GraspError, GraspRequest, GraspSettings, MotionGate, VisionRig};
use voice_link::{interpret, VoiceClient, VoiceCommand};

/// Stops a grasp once it is cancelled or the system leaves vision mode.
#[derive(Clone, Debug)]
pub struct WorkerGate {
    cancel: CancelFlag,
    mode: SharedMode,
}

impl WorkerGate {
    pub fn new(cancel: CancelFlag, mode: SharedMode) -> Self {
        Self { cancel, mode }
    }
}

impl MotionGate for WorkerGate {
    fn check(&self) -> vision_grasp::Result<()> {
        self.cancel.check()?;
        if self.mode.get() != ControlMode::VisionGuided {
            return Err(GraspError::Cancelled);
        }
        Ok(())
    }
}

/// How a job ended.
#[derive(Clone, Debug, PartialEq)]
pub enum JobOutcome {
    Grasped {
        object_id: String,
        arm: ArmSide,
        attempts: u32,
    },
    Message(Option<String>),
    ServerError(String),
    Unsupported(String),
    Empty,
    Failed(String),
}

/// Shared collaborators of every job.
pub struct WorkerContext {
    pub rig: Arc<Mutex<VisionRig>>,
    pub client: VoiceClient,
    pub settings: GraspSettings,
    pub notifier: Arc<dyn Notifier>,
    pub mode: SharedMode,
}

/// Runs at most one job at a time; a second submission is refused.
pub struct VisionWorker {
    ctx: Arc<WorkerContext>,
    busy: Arc<AtomicBool>,
    claim: ArmClaim,
    cancel: Mutex<CancelFlag>,
    handle: Mutex<Option<JoinHandle<JobOutcome>>>,
}

/// The arm a running grasp drives; the control loop leaves it alone until the job ends.
#[derive(Clone, Debug, Default)]
struct ArmClaim(Arc<AtomicU8>);

impl ArmClaim {
    fn set(&self, side: Option<ArmSide>) {
        let code = side.map_or(0, |s| s.index() as u8 + 1);
        self.0.store(code, Ordering::SeqCst);
    }

    fn get(&self) -> Option<ArmSide> {
        match self.0.load(Ordering::SeqCst) {
            0 => None,
            code => ArmSide::BOTH.get(usize::from(code - 1)).copied(),
        }
    }
}

struct BusyGuard {
    busy: Arc<AtomicBool>,
    claim: ArmClaim,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.claim.set(None);
        self.busy.store(false, Ordering::SeqCst);
    }
}

impl VisionWorker {
    pub fn new(ctx: WorkerContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            busy: Arc::new(AtomicBool::new(false)),
            claim: ArmClaim::default(),
            cancel: Mutex::new(CancelFlag::new()),
            handle: Mutex::new(None),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Arm the running job is moving, if it has got that far.
    pub fn busy_arm(&self) -> Option<ArmSide> {
        self.claim.get()
    }

    pub fn rig(&self) -> Arc<Mutex<VisionRig>> {
        self.ctx.rig.clone()
    }

    /// Start a job for a recorded clip.
    pub fn submit(&self, clip: Vec<u8>) -> Result<Uuid> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(TeleopError::Busy);
        }
        let guard = BusyGuard {
            busy: self.busy.clone(),
            claim: self.claim.clone(),
        };
        let job = Uuid::new_v4();
        let flag = CancelFlag::new();
        if let Ok(mut slot) = self.cancel.lock() {
            *slot = flag.clone();
        }
        let gate = WorkerGate::new(flag, self.ctx.mode.clone());
        let ctx = self.ctx.clone();
        let claim = self.claim.clone();

        let spawned = thread::Builder::new()
            .name("vision-worker".to_string())
            .spawn(move || {
                let _busy = guard;
                run_job(&ctx, &gate, &claim, job, clip)
            })
            .map_err(TeleopError::Spawn)?;

        if let Ok(mut h) = self.handle.lock() {
            *h = Some(spawned);
        }
        info!(%job, "vision job submitted");
        Ok(job)
    }

    /// Ask the running job to stop at its next checkpoint.
    pub fn cancel(&self) {
        if let Ok(flag) = self.cancel.lock() {
            flag.cancel();
        }
    }

    /// Block until the last submitted job finishes.
    pub fn wait(&self) -> Option<JobOutcome> {
        let handle = self.handle.lock().ok()?.take()?;
        handle.join().ok()
    }
}

fn run_job(
    ctx: &WorkerContext,
    gate: &WorkerGate,
    claim: &ArmClaim,
    job: Uuid,
    clip: Vec<u8>,
) -> JobOutcome {
    let span = tracing::info_span!("vision_job", %job);
    let _enter = span.enter();
    let notifier = ctx.notifier.as_ref();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => return fail(notifier, format!("runtime: {e}")),
    };
    let filename = format!("voice_{job}.wav");
    let reply = match runtime.block_on(ctx.client.exchange(&filename, &clip)) {
        Ok(reply) => reply,
        Err(e) => return fail(notifier, format!("voice server: {e}")),
    };
    if !reply.audio.is_empty() {
        notifier.sound(Sound::ServerResponseReceived);
        notifier.play_clip(&reply.audio);
    }

    match interpret(reply.json.as_ref()) {
        VoiceCommand::Grasp(target) => {
            let request = GraspRequest {
                object_id: target.id,
                approx_target_mm: target.base_coordinates_mm,
                arm: target.arm_choice,
                object_yaw_deg: None,
            };
            notifier.status(&format!(
                "grasping '{}' with the {} arm",
                request.object_id, request.arm
            ));
            claim.set(Some(request.arm));
            let result = match ctx.rig.lock() {
                Ok(mut rig) => rig.execute(&request, &ctx.settings, gate),
                Err(_) => Err(GraspError::Io("vision rig lock poisoned".to_string())),
            };
            claim.set(None);
            match result {
                Ok(outcome) => {
                    notifier.sound(Sound::ActionSuccessGeneral);
                    notifier.status(&format!("grasped '{}'", request.object_id));
                    JobOutcome::Grasped {
                        object_id: request.object_id,
                        arm: request.arm,
                        attempts: outcome.attempts,
                    }
                }
                Err(e) => fail(notifier, format!("grasp: {e}")),
            }
        }
        VoiceCommand::PlayMessage(message) => {
            notifier.status(message.as_deref().unwrap_or("(empty message)"));
            notifier.sound(Sound::ActionSuccessGeneral);
            JobOutcome::Message(message)
        }
        VoiceCommand::ServerError(e) => {
            warn!(error = %e, "command server reported an error");
            notifier.sound(Sound::ActionFailGeneral);
            notifier.status(&format!("server error: {e}"));
            JobOutcome::ServerError(e)
        }
        VoiceCommand::Unsupported(action) => {
            warn!(%action, "unsupported command");
            notifier.sound(Sound::ActionFailGeneral);
            notifier.status(&format!("unsupported command '{action}'"));
            JobOutcome::Unsupported(action)
        }
        VoiceCommand::Empty => {
            notifier.status("no command in reply");
            JobOutcome::Empty
        }
    }
}

fn fail(notifier: &dyn Notifier, msg: String) -> JobOutcome {
    warn!(error = %msg, "vision job failed");
    notifier.sound(Sound::ActionFailGeneral);
    notifier.status(&msg);
    JobOutcome::Failed(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemoryNotifier;
    use arm_link::frames::Matrix4;
    use arm_link::{share, MockArm, Pose6D};
    use serde_json::json;
    use std::time::Duration;
    use vision_grasp::{
        hand_camera, BoundingBox, CameraIntrinsics, Detection, MockCamera, MockDetector,
    };
    use voice_link::{CommandServer, VoiceClientConfig};

    fn rig() -> VisionRig {
        let mut rig = VisionRig::new();
        rig.insert_arm(
            ArmSide::Right,
            share(MockArm::new(ArmSide::Right).with_pose(Pose6D::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0))),
        );
        rig.insert_camera(
            hand_camera(ArmSide::Right),
            Box::new(
                MockCamera::new(CameraIntrinsics::new(600.0, 600.0, 320.0, 240.0), 640, 480)
                    .with_depth_fill(500),
            ),
        );
        rig.insert_detector(
            "cup",
            Box::new(MockDetector::new(vec![Detection {
                bbox: BoundingBox::new(310.0, 230.0, 330.0, 250.0),
                class_label: "cup".to_string(),
                confidence: 0.9,
            }])),
        );
        rig.set_calibration(ArmSide::Right, Matrix4::identity());
        rig
    }

    /// Serve `reply` once on an ephemeral port; returns the client config.
    fn serve(reply: serde_json::Value) -> VoiceClientConfig {
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                let server = CommandServer::bind("127.0.0.1:0", Some(reply), vec![1, 2, 3])
                    .await
                    .unwrap();
                tx.send(server.local_addr().unwrap()).unwrap();
                let _ = server.serve_one().await;
            });
        });
        let addr = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        VoiceClientConfig {
            server_addr: addr.to_string(),
            connect_timeout_s: 2.0,
            recv_timeout_s: 5.0,
        }
    }

    fn worker(
        voice: VoiceClientConfig,
        mode: ControlMode,
        notes: Arc<MemoryNotifier>,
    ) -> (VisionWorker, crate::mode::ModeMachine) {
        let mut modes = crate::mode::ModeMachine::new(Duration::from_millis(800));
        while modes.mode() != mode {
            modes.advance();
        }
        let settings = GraspSettings {
            retry_pause_ms: 0,
            ..GraspSettings::default()
        };
        let w = VisionWorker::new(WorkerContext {
            rig: Arc::new(Mutex::new(rig())),
            client: VoiceClient::new(voice),
            settings,
            notifier: notes,
            mode: modes.shared(),
        });
        (w, modes)
    }

    #[test]
    fn grasp_command_runs_the_pipeline() {
        let voice = serve(json!({
            "action": "grasp",
            "target": {"id": "cup", "base_coordinates_mm": [0, 0, 500], "arm_choice": "right"}
        }));
        let notes = Arc::new(MemoryNotifier::new());
        let (w, _modes) = worker(voice, ControlMode::VisionGuided, notes.clone());
        w.submit(b"RIFF".to_vec()).unwrap();
        let outcome = w.wait().unwrap();
        assert_eq!(
            outcome,
            JobOutcome::Grasped {
                object_id: "cup".to_string(),
                arm: ArmSide::Right,
                attempts: 1
            }
        );
        assert!(!w.is_busy());
        let sounds = notes.sounds();
        assert_eq!(sounds.first(), Some(&Sound::ServerResponseReceived));
        assert_eq!(sounds.last(), Some(&Sound::ActionSuccessGeneral));
    }

    #[test]
    fn leaving_vision_mode_cancels_motion() {
        let voice = serve(json!({
            "action": "grasp",
            "target": {"id": "cup", "base_coordinates_mm": [0, 0, 500], "arm_choice": "right"}
        }));
        let notes = Arc::new(MemoryNotifier::new());
        let (w, _modes) = worker(voice, ControlMode::CartesianJog, notes.clone());
        w.submit(Vec::new()).unwrap();
        assert!(matches!(
            w.wait(),
            Some(JobOutcome::Failed(msg)) if msg.contains("cancelled")
        ));
        assert_eq!(notes.sounds().last(), Some(&Sound::ActionFailGeneral));
    }

    #[test]
    fn second_submission_is_refused_while_busy() {
        let notes = Arc::new(MemoryNotifier::new());
        // A listener that accepts but never answers keeps the first job in flight.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let voice = VoiceClientConfig {
            server_addr: listener.local_addr().unwrap().to_string(),
            connect_timeout_s: 1.0,
            recv_timeout_s: 0.5,
        };
        let (w, _modes) = worker(voice, ControlMode::VisionGuided, notes);
        w.submit(vec![0]).unwrap();
        assert!(matches!(w.submit(vec![0]), Err(TeleopError::Busy)));
        assert!(matches!(w.wait(), Some(JobOutcome::Failed(_))));
        assert!(!w.is_busy());
        drop(listener);
    }

    #[test]
    fn play_message_becomes_status() {
        let voice = serve(json!({"action": "play_message", "message": "hello"}));
        let notes = Arc::new(MemoryNotifier::new());
        let (w, _modes) = worker(voice, ControlMode::VisionGuided, notes.clone());
        w.submit(vec![1]).unwrap();
        assert_eq!(
            w.wait(),
            Some(JobOutcome::Message(Some("hello".to_string())))
        );
        assert!(notes
            .notes()
            .contains(&crate::notify::Note::Status("hello".to_string())));
    }

    #[test]
    fn grasp_claims_its_arm_until_it_ends() {
        let voice = serve(json!({
            "action": "grasp",
            "target": {"id": "cup", "base_coordinates_mm": [0, 0, 500], "arm_choice": "right"}
        }));
        let notes = Arc::new(MemoryNotifier::new());
        let (w, _modes) = worker(voice, ControlMode::VisionGuided, notes);
        assert_eq!(w.busy_arm(), None);

        // Holding the rig parks the job right after it has claimed its arm.
        let rig = w.rig();
        let held = rig.lock().unwrap();
        w.submit(vec![1]).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while w.busy_arm().is_none() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(w.busy_arm(), Some(ArmSide::Right));
        drop(held);

        assert!(matches!(w.wait(), Some(JobOutcome::Grasped { .. })));
        assert_eq!(w.busy_arm(), None);
    }
}
