use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::{info, warn};
use voice_link::{AudioRecorder, CommandServer, MockRecorder, ReceivedClip};

#[derive(Parser, Debug)]
#[command(name = "command-server")]
#[command(about = "Answers voice clips with a fixed command over the voice-link protocol")]
struct Args {
    /// Listen address
    #[arg(long, default_value = "127.0.0.1:12345")]
    addr: String,

    /// JSON file with the command to reply with; a grasp command is used when omitted
    #[arg(long)]
    reply: Option<PathBuf>,

    /// WAV file sent back with every reply
    #[arg(long, conflicts_with = "tone")]
    reply_audio: Option<PathBuf>,

    /// Reply with a short synthetic tone instead of a WAV file
    #[arg(long)]
    tone: bool,

    /// Directory where received clips are written
    #[arg(long)]
    save_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();
    let args = Args::parse();

    let reply = match &args.reply {
        Some(path) => {
            let raw =
                fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<Value>(&raw)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => default_reply(),
    };
    let audio = match (&args.reply_audio, args.tone) {
        (Some(path), _) => fs::read(path).with_context(|| format!("reading {}", path.display()))?,
        (None, true) => {
            let mut rec = MockRecorder::new(16_000, 500);
            rec.start()?;
            rec.stop()?
        }
        (None, false) => Vec::new(),
    };
    if let Some(dir) = &args.save_dir {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let server = CommandServer::bind(&args.addr, Some(reply), audio)
        .await
        .with_context(|| format!("binding {}", args.addr))?;
    let local = server.local_addr()?;
    info!(addr = %local, "command server listening");

    let save_dir = args.save_dir.clone();
    server
        .run_with(move |clip| {
            info!(filename = %clip.filename, bytes = clip.audio.len(), "clip handled");
            if let Some(dir) = &save_dir {
                if let Err(e) = save_clip(dir, &clip) {
                    warn!(error = %format!("{e:#}"), "clip not saved");
                }
            }
        })
        .await?;
    Ok(())
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn default_reply() -> Value {
    json!({
        "action": "grasp",
        "target": {
            "id": "default_object_id_123",
            "base_coordinates_mm": [350.0, -150.0, 50.0],
            "arm_choice": "right"
        },
        "status": "success",
        "message": "This is a default response from the command server.",
        "confidence": 0.95,
        "timestamp": OffsetDateTime::now_utc().unix_timestamp()
    })
}

fn save_clip(dir: &Path, clip: &ReceivedClip) -> Result<PathBuf> {
    let now = OffsetDateTime::now_utc();
    let name = format!(
        "client_{:04}{:02}{:02}{:02}{:02}{:02}_{}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second(),
        clip.filename.replace(['/', '\\'], "_")
    );
    let path = dir.join(name);
    fs::write(&path, &clip.audio).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "clip saved");
    Ok(path)
}
