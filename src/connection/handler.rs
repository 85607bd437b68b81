//! Connection Handler Module
//!
//! This module handles individual client connections. Each connection is
//! served by two cooperating tasks joined by a bounded queue of commands.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. Stream split into read and write halves
//!        │
//!        ├──────────────────────────────┐
//!        ▼                              ▼
//! 3. ┌────────────────────┐  mpsc   ┌────────────────────┐
//!    │   DecodeWorker     │ (cap    │     Executor       │
//!    │                    │  10)    │                    │
//!    │ read bytes         │────────>│ recv command       │
//!    │ FrameDecoder       │         │ execute on Context │
//!    │ send Command       │         │ write reply, flush │
//!    └─────────┬──────────┘         └─────────┬──────────┘
//!              │ EOF: close queue             │ queue drained
//!              ▼                              ▼
//! 4. Both halves done, connection closed
//! ```
//!
//! Replies go out in exactly the order the commands were decoded. When the
//! queue is full the decode worker stops reading, which pushes back on the
//! client.
//!
//! ## Buffer Management
//!
//! We use a BytesMut buffer to accumulate incoming data. This is important
//! because TCP is a stream protocol - we might receive partial commands,
//! or multiple commands in a single read.

use crate::commands::{Command, CommandError};
use crate::protocol::{Decoded, FrameDecoder, MAX_BULK_SIZE};
use crate::server::Context;
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter, WriteHalf};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

/// Capacity of the queue between the decode worker and the executor
pub const COMMAND_QUEUE_CAPACITY: usize = 10;

/// Maximum size for the read buffer: one maximal bulk string plus headroom
const MAX_BUFFER_SIZE: usize = MAX_BULK_SIZE + 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Reads from the client and turns bytes into commands.
struct DecodeWorker<R> {
    reader: R,
    addr: SocketAddr,
    buffer: BytesMut,
    decoder: FrameDecoder,
    ctx: Arc<Context>,
}

impl<R: AsyncRead + Unpin> DecodeWorker<R> {
    fn new(reader: R, addr: SocketAddr, ctx: Arc<Context>) -> Self {
        Self {
            reader,
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            decoder: FrameDecoder::new(),
            ctx,
        }
    }

    /// Decodes until the stream ends. Dropping `tx` on return closes the queue.
    async fn run(mut self, tx: mpsc::Sender<Command>) -> Result<(), ConnectionError> {
        loop {
            while let Some((decoded, consumed)) = self.decoder.decode(&self.buffer) {
                let _ = self.buffer.split_to(consumed);
                let Decoded::Command(command) = decoded else {
                    continue;
                };

                if let Command::Error(e) = &command {
                    debug!(client = %self.addr, error = %e, "Malformed request");
                }
                if tx.send(command).await.is_err() {
                    // Executor is gone, nobody will read the replies.
                    return Ok(());
                }
            }

            if !self.read_more_data().await? {
                if self.buffer.is_empty() {
                    return Ok(());
                }
                let _ = tx
                    .send(Command::Error(CommandError::InvalidRedisCommand))
                    .await;
                return Err(ConnectionError::UnexpectedEof);
            }
        }
    }

    /// Reads more data from the socket into the buffer.
    ///
    /// Returns `false` once the client has closed its side of the stream.
    async fn read_more_data(&mut self) -> Result<bool, ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                "Buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        let n = self.reader.read_buf(&mut self.buffer).await?;
        if n == 0 {
            return Ok(false);
        }

        self.ctx.stats().bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");
        Ok(true)
    }
}

/// Executes queued commands in order and writes their replies.
async fn execute_commands<W: AsyncWrite>(
    writer: &mut BufWriter<WriteHalf<W>>,
    rx: &mut mpsc::Receiver<Command>,
    ctx: &Context,
    addr: SocketAddr,
) -> Result<(), ConnectionError> {
    while let Some(command) = rx.recv().await {
        let reply = command.execute(ctx);
        ctx.stats().command_processed();

        writer.write_all(&reply).await?;
        writer.flush().await?;
        ctx.stats().bytes_written(reply.len());
        trace!(
            client = %addr,
            command = command.name(),
            bytes = reply.len(),
            "Sent response"
        );
    }
    Ok(())
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Unexpected end of stream (partial command)
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// Buffer size limit exceeded
    #[error("Buffer size limit exceeded")]
    BufferFull,
}

/// Serves one client connection until both halves of the pipeline finish.
///
/// # Arguments
///
/// * `stream` - The client stream, usually a `TcpStream`
/// * `addr` - The client's socket address (for logging)
/// * `ctx` - Shared server context the commands execute against
pub async fn handle_connection<S>(stream: S, addr: SocketAddr, ctx: Arc<Context>)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    ctx.stats().connection_opened();
    info!(client = %addr, "Client connected");

    let (reader, writer) = tokio::io::split(stream);
    let (tx, mut rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);

    let worker = DecodeWorker::new(reader, addr, Arc::clone(&ctx));
    let decoding = tokio::spawn(worker.run(tx));

    let mut writer = BufWriter::new(writer);
    let executed = execute_commands(&mut writer, &mut rx, &ctx, addr).await;
    if executed.is_err() {
        // Replies can no longer be delivered; stop reading as well.
        decoding.abort();
    }

    let decoded = match decoding.await {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => Ok(()),
        Err(e) => {
            warn!(client = %addr, error = %e, "Decode worker failed");
            Ok(())
        }
    };

    match executed.and(decoded) {
        Ok(()) => info!(client = %addr, "Client disconnected gracefully"),
        Err(ConnectionError::IoError(io_err))
            if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
        {
            debug!(client = %addr, "Connection reset by client")
        }
        Err(e) => warn!(client = %addr, error = %e, "Connection error"),
    }

    ctx.stats().connection_closed();
}
