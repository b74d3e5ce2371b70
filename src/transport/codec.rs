#![cfg(feature = "std")]

//! Line-delimited JSON framing: one ASCII-only JSON object per `\n`-terminated line.

use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::protocol::GameMessage;

/// Maximum encoded line length, newline excluded.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Writes non-ASCII characters as `\uXXXX` escapes.
struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

/// Encode `msg` as a single line, trailing newline included.
pub fn encode(msg: &GameMessage) -> anyhow::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(128);
    let mut ser = Serializer::with_formatter(&mut buf, AsciiFormatter);
    msg.serialize(&mut ser)
        .map_err(|e| anyhow::anyhow!("Serialization error: {}", e))?;
    if buf.len() > MAX_LINE_LEN {
        return Err(anyhow::anyhow!(
            "Message too large: {} bytes (max: {})",
            buf.len(),
            MAX_LINE_LEN
        ));
    }
    buf.push(b'\n');
    Ok(buf)
}

/// Decode one line, with or without its line terminator.
pub fn decode(line: &str) -> anyhow::Result<GameMessage> {
    serde_json::from_str(line.trim_end_matches(['\r', '\n']))
        .map_err(|e| anyhow::anyhow!("Deserialization error: {}", e))
}

/// Read the next message. `Ok(None)` means the peer closed the stream cleanly.
pub async fn read_message<R>(reader: &mut R) -> anyhow::Result<Option<GameMessage>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        let n = (&mut *reader)
            .take(MAX_LINE_LEN as u64 + 1)
            .read_line(&mut line)
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::ConnectionReset => anyhow::anyhow!("Connection reset by peer"),
                io::ErrorKind::InvalidData => anyhow::anyhow!("Message is not valid UTF-8"),
                _ => anyhow::anyhow!("Read error: {}", e),
            })?;
        if n == 0 {
            return Ok(None);
        }
        if !line.ends_with('\n') {
            if n > MAX_LINE_LEN {
                return Err(anyhow::anyhow!(
                    "Message too large: more than {} bytes",
                    MAX_LINE_LEN
                ));
            }
            return Err(anyhow::anyhow!("Connection closed by peer mid-message"));
        }
        if line.trim().is_empty() {
            continue;
        }
        return decode(&line).map(Some);
    }
}

/// Encode and write one message, flushing the stream.
pub async fn write_message<W>(writer: &mut W, msg: &GameMessage) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let data = encode(msg)?;
    let map_write = |e: io::Error| {
        if e.kind() == io::ErrorKind::BrokenPipe || e.kind() == io::ErrorKind::ConnectionReset {
            anyhow::anyhow!("Connection closed by peer")
        } else {
            anyhow::anyhow!("Write error: {}", e)
        }
    };
    writer.write_all(&data).await.map_err(map_write)?;
    writer.flush().await.map_err(map_write)?;
    Ok(())
}
