use crate::protocol::{read_request, write_reply};
use crate::Result;
use serde_json::Value;
use std::net::SocketAddr;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};

/// Clip received from a client.
#[derive(Clone, Debug, PartialEq)]
pub struct ReceivedClip {
    pub filename: String,
    pub audio: Vec<u8>,
}

/// Stand-in command interpreter that answers every clip with a fixed reply.
pub struct CommandServer {
    listener: TcpListener,
    reply_json: Option<Value>,
    reply_audio: Vec<u8>,
}

impl CommandServer {
    pub async fn bind(addr: &str, reply_json: Option<Value>, reply_audio: Vec<u8>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            reply_json,
            reply_audio,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept one client, read its clip and send the reply.
    pub async fn serve_one(&self) -> Result<ReceivedClip> {
        let (stream, peer) = self.listener.accept().await?;
        tracing::info!(%peer, "client connected");
        self.handle(stream).await
    }

    /// Serve clients one after another until the listener fails.
    pub async fn run(self) -> Result<()> {
        self.run_with(|clip| {
            tracing::info!(filename = %clip.filename, bytes = clip.audio.len(), "clip handled")
        })
        .await
    }

    /// Like [`run`](Self::run), handing every received clip to `on_clip`.
    pub async fn run_with(self, mut on_clip: impl FnMut(ReceivedClip)) -> Result<()> {
        loop {
            match self.serve_one().await {
                Ok(clip) => on_clip(clip),
                Err(crate::LinkError::Io(e)) if is_fatal(&e) => return Err(e.into()),
                Err(e) => tracing::warn!(error = %e, "client exchange failed"),
            }
        }
    }

    async fn handle(&self, stream: TcpStream) -> Result<ReceivedClip> {
        let mut reader = BufReader::new(stream);
        let (filename, audio) = read_request(&mut reader).await?;
        tracing::debug!(%filename, bytes = audio.len(), "clip received");
        write_reply(reader.get_mut(), self.reply_json.as_ref(), &self.reply_audio).await?;
        Ok(ReceivedClip { filename, audio })
    }
}

fn is_fatal(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::AddrInUse | std::io::ErrorKind::PermissionDenied
    )
}
