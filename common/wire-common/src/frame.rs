//! Newline-delimited JSON framing
//!
//! One message per line: serialize, write, `\n`, flush. Both the agent's
//! sessions and the tool servers use these helpers so the framing can never
//! drift between the two sides.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Errors produced while reading or writing a frame
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("connection closed")]
    Closed,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Write a single message as one JSON line
pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let json = serde_json::to_string(message)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

/// Read a single message from one JSON line
///
/// Returns `FrameError::Closed` on EOF so callers can tell a clean shutdown
/// from a protocol error.
pub async fn read_frame<R, T>(reader: &mut BufReader<R>) -> Result<T, FrameError>
where
    R: tokio::io::AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Err(FrameError::Closed);
    }
    Ok(serde_json::from_str(line.trim_end())?)
}
