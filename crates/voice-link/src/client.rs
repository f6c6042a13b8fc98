use crate::protocol::{read_reply, write_request};
use crate::{LinkError, Reply, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceClientConfig {
    pub server_addr: String,
    pub connect_timeout_s: f64,
    pub recv_timeout_s: f64,
}

impl Default for VoiceClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:12345".to_string(),
            connect_timeout_s: 10.0,
            recv_timeout_s: 15.0,
        }
    }
}

/// One-shot client: every [`exchange`](VoiceClient::exchange) opens a fresh connection.
#[derive(Clone, Debug)]
pub struct VoiceClient {
    config: VoiceClientConfig,
}

impl VoiceClient {
    pub fn new(config: VoiceClientConfig) -> Self {
        Self { config }
    }

    pub fn address(&self) -> &str {
        &self.config.server_addr
    }

    /// Send a clip and wait for the interpreter's reply.
    pub async fn exchange(&self, filename: &str, audio: &[u8]) -> Result<Reply> {
        let addr = self.config.server_addr.as_str();
        let connect = timeout(
            secs(self.config.connect_timeout_s),
            TcpStream::connect(addr),
        )
        .await
        .map_err(|_| LinkError::Timeout("connecting"))?;
        let mut stream = connect.map_err(|e| LinkError::Connect {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;
        tracing::info!(addr, filename, bytes = audio.len(), "sending voice clip");

        let reply = timeout(secs(self.config.recv_timeout_s), async {
            write_request(&mut stream, filename, audio).await?;
            read_reply(&mut stream).await
        })
        .await
        .map_err(|_| LinkError::Timeout("waiting for reply"))??;

        tracing::info!(
            has_json = reply.json.is_some(),
            audio_bytes = reply.audio.len(),
            "received voice reply"
        );
        Ok(reply)
    }
}

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s.max(0.0))
}
