use anyhow::{Context, Result};
use arm_link::frames::matrix_to_pose;
use arm_link::{bring_up, lock_arm, ArmSide};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use teleop_core::{
    load_config, ControlMode, LogNotifier, ReplayDevice, TeleopConfig, TeleopController,
};
use tracing::{info, warn};
use vision_grasp::calib::load_hand_eye;
use vision_grasp::{CancelFlag, GraspRequest};
use voice_link::{interpret, AudioRecorder, MockRecorder, VoiceClient, VoiceClientConfig};

mod hardware;

#[derive(Parser, Debug)]
#[command(
    name = "dual-arm",
    version,
    about = "Dual-arm teleoperation and vision-guided grasping",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the control loop, reading device snapshots from an NDJSON replay
    Run {
        /// Configuration YAML
        #[arg(long, default_value = "configs/dual_arm.yaml")]
        config: PathBuf,
        /// NDJSON file with one device snapshot per tick
        #[arg(long)]
        input: PathBuf,
    },
    /// Load and validate a configuration, then print what it resolved to
    CheckConfig {
        #[arg(long, default_value = "configs/dual_arm.yaml")]
        config: PathBuf,
    },
    /// Print a hand-eye calibration file as a matrix and a pose
    CalibShow {
        #[arg(long)]
        file: PathBuf,
    },
    /// Send a WAV clip to the command server and print the reply
    VoiceSend {
        /// Server address; defaults to the configured one
        #[arg(long)]
        addr: Option<String>,
        /// WAV file to send; a synthetic tone is used when omitted
        #[arg(long)]
        wav: Option<PathBuf>,
        /// Where to write the reply audio, if any
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, default_value = "configs/dual_arm.yaml")]
        config: PathBuf,
    },
    /// Run one grasp against the mock rig
    Grasp {
        #[arg(long, default_value = "configs/dual_arm.yaml")]
        config: PathBuf,
        /// Object id; selects the detector model
        #[arg(long)]
        object: String,
        /// Approximate target in the base frame, mm, as x,y,z
        #[arg(long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
        target: Vec<f64>,
        #[arg(long, default_value = "right")]
        arm: String,
        /// Object yaw in degrees
        #[arg(long, allow_hyphen_values = true)]
        yaw: Option<f64>,
    },
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, input } => run(&config, &input),
        Commands::CheckConfig { config } => check_config(&config),
        Commands::CalibShow { file } => calib_show(&file),
        Commands::VoiceSend {
            addr,
            wav,
            out,
            config,
        } => voice_send(addr, wav, out, &config),
        Commands::Grasp {
            config,
            object,
            target,
            arm,
            yaw,
        } => grasp(&config, object, &target, &arm, yaw),
    }
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn run(config_path: &Path, input: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let mut device = ReplayDevice::open(input)?;
    info!(ticks = device.remaining(), "replay loaded");

    let notifier = Arc::new(LogNotifier::new(config.audio_files.clone()));
    let rig = hardware::vision_rig(&config.setup);
    let setup = config.setup.clone();
    let mut controller =
        TeleopController::new(config, rig, Box::new(MockRecorder::default()), notifier);
    for side in ArmSide::BOTH {
        if !controller.attach_arm(side, hardware::mock_arm(&setup, side)) {
            warn!(arm = %side, "arm unavailable; its controls are inert");
        }
    }

    let stop = Arc::new(AtomicBool::new(false));
    watch_ctrl_c(stop.clone());
    let ticks = controller.run(&mut device, &stop);
    controller.shutdown();
    println!("ticks: {ticks}");
    println!("final mode: {}", controller.mode());
    Ok(())
}

fn watch_ctrl_c(stop: Arc<AtomicBool>) {
    let spawned = thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            let Ok(rt) = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            else {
                return;
            };
            if rt.block_on(tokio::signal::ctrl_c()).is_ok() {
                info!("interrupt received; stopping");
                stop.store(true, Ordering::SeqCst);
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "no interrupt handler");
    }
}

fn check_config(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    print_summary(&config);
    Ok(())
}

fn print_summary(config: &TeleopConfig) {
    let s = &config.settings;
    println!("arms: left {} right {}", config.setup.left_robot_ip, config.setup.right_robot_ip);
    println!(
        "speeds: xy {} z {} rpy {} (step {}, range {}..={})",
        s.initial_speed_xy, s.initial_speed_z, s.rpy_speed, s.speed_increment, s.min_speed, s.max_speed
    );
    println!("loop: {} Hz, long press {} s", s.loop_hz, s.long_press_duration);
    let modes: Vec<String> = ControlMode::ALL.iter().map(ToString::to_string).collect();
    println!("modes: {}", modes.join(" -> "));
    println!("bindings ({}):", config.bindings.len());
    for (action, binding) in config.bindings.iter() {
        println!("  {:<32} {:?} {}", action.to_string(), binding.kind, binding.index);
    }
    println!("cameras: {:?}", config.setup.camera_serials.keys().collect::<Vec<_>>());
    println!("models: {:?}", config.setup.yolo_models.keys().collect::<Vec<_>>());
    println!("voice server: {}", config.voice.server_addr);
}

fn calib_show(file: &Path) -> Result<()> {
    let m = load_hand_eye(file).with_context(|| format!("loading {}", file.display()))?;
    println!("end-effector -> camera:");
    for r in 0..4 {
        println!(
            "  [{:>10.6} {:>10.6} {:>10.6} {:>10.6}]",
            m[(r, 0)],
            m[(r, 1)],
            m[(r, 2)],
            m[(r, 3)]
        );
    }
    let pose = matrix_to_pose(&m).context("matrix is not a rigid transform")?;
    println!("as pose (mm, deg): {:?}", pose.to_array());
    Ok(())
}

fn voice_send(
    addr: Option<String>,
    wav: Option<PathBuf>,
    out: Option<PathBuf>,
    config_path: &Path,
) -> Result<()> {
    let mut client_config = match load_config(config_path) {
        Ok(c) => c.voice,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "using default voice settings");
            VoiceClientConfig::default()
        }
    };
    if let Some(addr) = addr {
        client_config.server_addr = addr;
    }
    let (filename, audio) = match wav {
        Some(path) => {
            let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "clip.wav".to_string());
            (name, bytes)
        }
        None => {
            let mut rec = MockRecorder::default();
            rec.start()?;
            ("synthetic.wav".to_string(), rec.stop()?)
        }
    };

    let client = VoiceClient::new(client_config);
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building runtime")?;
    info!(server = client.address(), bytes = audio.len(), "sending clip");
    let reply = rt.block_on(client.exchange(&filename, &audio))?;

    match &reply.json {
        Some(json) => println!("{}", serde_json::to_string_pretty(json)?),
        None => println!("(no command)"),
    }
    println!("interpreted: {:?}", interpret(reply.json.as_ref()));
    if !reply.audio.is_empty() {
        match out {
            Some(path) => {
                std::fs::write(&path, &reply.audio)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("reply audio: {} bytes -> {}", reply.audio.len(), path.display());
            }
            None => println!("reply audio: {} bytes", reply.audio.len()),
        }
    }
    Ok(())
}

fn grasp(config_path: &Path, object: String, target: &[f64], arm: &str, yaw: Option<f64>) -> Result<()> {
    let config = load_config(config_path)?;
    let side = ArmSide::parse(arm).with_context(|| format!("unknown arm '{arm}'"))?;
    let approx: [f64; 3] = target
        .try_into()
        .map_err(|_| anyhow::anyhow!("--target needs exactly three values"))?;

    let mut rig = hardware::vision_rig(&config.setup);
    let handle = hardware::mock_arm(&config.setup, side);
    {
        let mut guard = lock_arm(&handle)?;
        bring_up(&mut *guard, side.as_str())?;
    }
    rig.insert_arm(side, handle);

    let request = GraspRequest {
        object_id: object,
        approx_target_mm: approx,
        arm: side,
        object_yaw_deg: yaw,
    };
    let outcome = rig.execute(&request, &config.vision, &CancelFlag::new());
    rig.close_cameras();
    let outcome = outcome?;
    println!(
        "grasped '{}' with the {} arm after {} attempt(s)",
        request.object_id, side, outcome.attempts
    );
    println!("grasp pose: {:?}", outcome.plan.grasp.to_array());
    Ok(())
}
