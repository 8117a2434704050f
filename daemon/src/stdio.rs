//! Line-delimited JSON transport over stdin/stdout.
//!
//! Each inbound line is `{"from": "<peer>", "message": {...}}`. Each
//! outbound line is `{"to": "<peer>" | null, "message": {...}}`, where a
//! null `to` is a broadcast. An external process relays lines between
//! daemons.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use valchain_messages::{MessageError, PeerId, Transport};
use valchain_node::{NodeHandle, ShutdownSignal};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Inbound {
    from: String,
    message: Value,
}

#[derive(Debug, Serialize)]
struct Outbound<'a> {
    to: Option<&'a str>,
    message: Value,
}

/// Queues outbound lines for the stdout writer task.
pub struct StdioTransport {
    lines: mpsc::UnboundedSender<String>,
}

impl StdioTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (lines, rx) = mpsc::unbounded_channel();
        (Self { lines }, rx)
    }

    fn emit(&self, to: Option<&PeerId>, bytes: Vec<u8>) -> Result<(), MessageError> {
        let message: Value = serde_json::from_slice(&bytes)
            .map_err(|e| MessageError::Transport(e.to_string()))?;
        let line = serde_json::to_string(&Outbound {
            to: to.map(PeerId::as_str),
            message,
        })
        .map_err(|e| MessageError::Transport(e.to_string()))?;
        self.lines
            .send(line)
            .map_err(|_| MessageError::Transport("stdout writer closed".into()))
    }
}

impl Transport for StdioTransport {
    fn send(&self, peer: &PeerId, bytes: Vec<u8>) -> Result<(), MessageError> {
        self.emit(Some(peer), bytes)
    }

    fn broadcast(&self, bytes: Vec<u8>) -> Result<(), MessageError> {
        self.emit(None, bytes)
    }
}

/// Write queued lines until every transport handle is dropped.
pub async fn write_lines<W>(
    mut writer: W,
    mut lines: mpsc::UnboundedReceiver<String>,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = lines.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

/// Feed inbound lines to the node until EOF or shutdown.
pub async fn read_lines<R>(
    reader: R,
    handle: NodeHandle,
    mut shutdown: ShutdownSignal,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            line = lines.next_line() => match line? {
                Some(line) => relay(&handle, &line).await?,
                None => {
                    tracing::info!("stdin closed");
                    break;
                }
            },
        }
    }
    Ok(())
}

async fn relay(handle: &NodeHandle, line: &str) -> anyhow::Result<()> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }
    let Inbound { from, message } = match serde_json::from_str(line) {
        Ok(inbound) => inbound,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring malformed input line");
            return Ok(());
        }
    };
    let bytes = message.to_string().into_bytes();
    handle.deliver(PeerId::new(from), &bytes).await?;
    Ok(())
}
