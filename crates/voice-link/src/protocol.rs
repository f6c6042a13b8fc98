//! Wire framing for the voice command exchange.

use crate::{LinkError, Result};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest JSON section a client accepts (exclusive).
pub const MAX_JSON_LEN: u32 = 10 * 1024 * 1024;
/// Largest audio section a client accepts (exclusive).
pub const MAX_AUDIO_LEN: u32 = 50 * 1024 * 1024;
/// Largest request header line, including the newline.
const MAX_HEADER_LEN: usize = 1024;

/// What the server sent back. `json` is `None` for a zero-length JSON section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub json: Option<Value>,
    pub audio: Vec<u8>,
}

/// Replace characters that would break the header line.
pub fn sanitize_filename(name: &str) -> String {
    name.replace(['\n', ':'], "_")
}

pub fn encode_header(filename: &str, len: usize) -> String {
    format!("{}:{}\n", sanitize_filename(filename), len)
}

/// Split `"<filename>:<len>"` (trailing newline allowed).
pub fn parse_header(line: &str) -> Result<(String, u64)> {
    let line = line.trim_end_matches(['\n', '\r']);
    let (name, len) = line
        .rsplit_once(':')
        .ok_or_else(|| LinkError::Header(line.to_string()))?;
    let len = len
        .trim()
        .parse::<u64>()
        .map_err(|_| LinkError::Header(line.to_string()))?;
    Ok((name.to_string(), len))
}

pub async fn write_request<W>(w: &mut W, filename: &str, audio: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    w.write_all(encode_header(filename, audio.len()).as_bytes())
        .await?;
    w.write_all(audio).await?;
    w.flush().await?;
    Ok(())
}

pub async fn read_request<R>(r: &mut R) -> Result<(String, Vec<u8>)>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let n = (&mut *r)
        .take(MAX_HEADER_LEN as u64)
        .read_until(b'\n', &mut line)
        .await?;
    if n == 0 || line.last() != Some(&b'\n') {
        return Err(LinkError::Header("missing header line".to_string()));
    }
    let text = String::from_utf8(line).map_err(|e| LinkError::Header(e.to_string()))?;
    let (name, len) = parse_header(&text)?;
    if len >= u64::from(MAX_AUDIO_LEN) {
        return Err(LinkError::FrameTooLarge {
            section: "request audio",
            len: u32::try_from(len).unwrap_or(u32::MAX),
        });
    }
    let mut audio = vec![0u8; len as usize];
    r.read_exact(&mut audio).await?;
    Ok((name, audio))
}

pub async fn write_reply<W>(w: &mut W, json: Option<&Value>, audio: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = match json {
        Some(v) => serde_json::to_vec(v)?,
        None => Vec::new(),
    };
    w.write_all(&section_len(body.len(), "json")?.to_be_bytes())
        .await?;
    w.write_all(&body).await?;
    w.write_all(&section_len(audio.len(), "audio")?.to_be_bytes())
        .await?;
    w.write_all(audio).await?;
    w.flush().await?;
    Ok(())
}

pub async fn read_reply<R>(r: &mut R) -> Result<Reply>
where
    R: AsyncRead + Unpin,
{
    let json_bytes = read_section(r, "json", MAX_JSON_LEN).await?;
    let audio = read_section(r, "audio", MAX_AUDIO_LEN).await?;
    let json = if json_bytes.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&json_bytes)?)
    };
    Ok(Reply { json, audio })
}

fn section_len(len: usize, section: &'static str) -> Result<u32> {
    u32::try_from(len).map_err(|_| LinkError::FrameTooLarge {
        section,
        len: u32::MAX,
    })
}

async fn read_section<R>(r: &mut R, section: &'static str, max: u32) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let len = r.read_u32().await?;
    if len >= max {
        return Err(LinkError::FrameTooLarge { section, len });
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf).await?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::BufReader;

    #[test]
    fn header_sanitizes_separators() {
        assert_eq!(encode_header("cmd:1\n.wav", 42), "cmd_1_.wav:42\n");
        assert_eq!(parse_header("clip.wav:1024\n").unwrap(), ("clip.wav".to_string(), 1024));
        assert!(parse_header("clip.wav").is_err());
        assert!(parse_header("clip.wav:abc").is_err());
    }

    #[tokio::test]
    async fn request_bytes_on_the_wire() {
        let mut buf = Vec::new();
        write_request(&mut buf, "voice.wav", &[1, 2, 3]).await.unwrap();
        assert_eq!(buf, b"voice.wav:3\n\x01\x02\x03".to_vec());

        let mut reader = BufReader::new(&buf[..]);
        let (name, audio) = read_request(&mut reader).await.unwrap();
        assert_eq!(name, "voice.wav");
        assert_eq!(audio, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn reply_layout_is_length_prefixed_big_endian() {
        let cmd = json!({"action": "play_message", "message": "hi"});
        let mut buf = Vec::new();
        write_reply(&mut buf, Some(&cmd), &[9, 9]).await.unwrap();
        let body = serde_json::to_vec(&cmd).unwrap();
        assert_eq!(&buf[..4], &(body.len() as u32).to_be_bytes());
        assert_eq!(&buf[4..4 + body.len()], &body[..]);
        assert_eq!(&buf[4 + body.len()..8 + body.len()], &[0, 0, 0, 2]);

        let reply = read_reply(&mut &buf[..]).await.unwrap();
        assert_eq!(reply.json, Some(cmd));
        assert_eq!(reply.audio, vec![9, 9]);
    }

    #[tokio::test]
    async fn empty_sections_are_valid() {
        let wire = [0u8, 0, 0, 0, 0, 0, 0, 0];
        let reply = read_reply(&mut &wire[..]).await.unwrap();
        assert_eq!(reply, Reply::default());
    }

    #[tokio::test]
    async fn oversized_json_is_rejected() {
        let wire = MAX_JSON_LEN.to_be_bytes();
        let err = read_reply(&mut &wire[..]).await.unwrap_err();
        assert!(matches!(err, LinkError::FrameTooLarge { section: "json", .. }));
    }

    #[tokio::test]
    async fn truncated_reply_is_an_io_error() {
        let wire = [0u8, 0, 0, 10, b'{'];
        assert!(matches!(
            read_reply(&mut &wire[..]).await,
            Err(LinkError::Io(_))
        ));
    }
}
