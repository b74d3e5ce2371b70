//! Message channel over an established byte stream.
//!
//! A `Channel` splits the stream and runs two tasks: a reader decoding one message
//! per line into a queue, and a writer draining an outbound queue. `send` never
//! blocks; a message that cannot be written is dropped. The inbound side ends, for
//! good, on EOF, on a read error or on the first line that fails to decode.

pub mod codec;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite, BufReader, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};

use crate::protocol::GameMessage;
use codec::{read_message, write_message};

/// Decoded messages buffered ahead of the session.
const INBOUND_CAPACITY: usize = 64;

pub struct Channel {
    outbound: mpsc::UnboundedSender<GameMessage>,
    inbound: mpsc::Receiver<GameMessage>,
    alive: Arc<AtomicBool>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Channel {
    /// Start reading and writing `stream`. Each write is abandoned after `write_timeout`.
    pub fn spawn<S>(stream: S, write_timeout: Duration) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let alive = Arc::new(AtomicBool::new(true));
        let (in_tx, in_rx) = mpsc::channel(INBOUND_CAPACITY);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_loop(BufReader::new(read_half), in_tx, alive.clone()));
        let writer = tokio::spawn(write_loop(write_half, out_rx, write_timeout, alive.clone()));
        Self {
            outbound: out_tx,
            inbound: in_rx,
            alive,
            reader,
            writer,
        }
    }

    /// Queue `msg` for the peer and return immediately.
    pub fn send(&self, msg: GameMessage) {
        if let Err(e) = self.outbound.send(msg) {
            log::debug!("writer gone, dropping {:?}", e.0.kind);
        }
    }

    /// Next message from the peer, in send order. `None` once the connection has ended.
    pub async fn recv(&mut self) -> Option<GameMessage> {
        self.inbound.recv().await
    }

    /// `false` once the stream hit EOF, a read or write error, or a malformed line.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

async fn read_loop<R>(mut reader: R, inbound: mpsc::Sender<GameMessage>, alive: Arc<AtomicBool>)
where
    R: AsyncBufRead + Unpin,
{
    loop {
        match read_message(&mut reader).await {
            Ok(Some(msg)) => {
                if inbound.send(msg).await.is_err() {
                    break;
                }
            }
            Ok(None) => {
                log::info!("connection closed by peer");
                break;
            }
            Err(e) => {
                log::warn!("closing connection: {}", e);
                break;
            }
        }
    }
    alive.store(false, Ordering::SeqCst);
}

async fn write_loop<S>(
    mut writer: WriteHalf<S>,
    mut outbound: mpsc::UnboundedReceiver<GameMessage>,
    write_timeout: Duration,
    alive: Arc<AtomicBool>,
) where
    S: AsyncRead + AsyncWrite,
{
    while let Some(msg) = outbound.recv().await {
        let kind = msg.kind;
        match timeout(write_timeout, write_message(&mut writer, &msg)).await {
            Ok(Ok(())) => log::trace!("sent {:?}", kind),
            Ok(Err(e)) => {
                log::debug!("dropping {:?}: {}", kind, e);
                alive.store(false, Ordering::SeqCst);
            }
            Err(_) => {
                log::debug!("dropping {:?}: write timeout after {:?}", kind, write_timeout);
                alive.store(false, Ordering::SeqCst);
            }
        }
    }
}
