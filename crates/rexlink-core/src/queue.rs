//! Serialized write pipeline
//!
//! All outbound bytes pass through one worker task, so at most one channel
//! write is ever in flight and messages complete in the order they were
//! enqueued. Each message is newline-terminated, split into bounded chunks
//! and written chunk by chunk. A chunk that hits a busy adapter is retried
//! exactly once; any other failure ends the message immediately.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::codec;
use crate::config::QueueConfig;
use crate::errors::LinkError;
use crate::Result;

// ----------------------------------------------------------------------------
// Transport Interfaces
// ----------------------------------------------------------------------------

/// Outbound byte channel of the active connection
#[async_trait]
pub trait Channel: Send + Sync {
    /// Write one chunk; must not be called concurrently
    async fn write(&self, chunk: &[u8]) -> Result<()>;

    fn is_connected(&self) -> bool;
}

/// What the dispatcher needs from the transport
pub trait CommandSink: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Queue a message for transmission; the returned future completes when
    /// the message has been written or has failed
    fn submit(&self, bytes: Vec<u8>) -> PendingWrite;
}

// ----------------------------------------------------------------------------
// Completion
// ----------------------------------------------------------------------------

/// Outcome of a successfully written message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReport {
    /// Bytes written, including the line terminator
    pub bytes: usize,
    pub chunks: usize,
    /// Busy retries used across all chunks
    pub retries: usize,
}

/// Completion future for one enqueued message
#[must_use = "dropping a PendingWrite discards the send result"]
pub struct PendingWrite {
    state: PendingState,
}

enum PendingState {
    Waiting(oneshot::Receiver<Result<WriteReport>>),
    Failed(Option<LinkError>),
}

impl PendingWrite {
    pub fn failed(error: LinkError) -> Self {
        Self {
            state: PendingState::Failed(Some(error)),
        }
    }
}

impl Future for PendingWrite {
    type Output = Result<WriteReport>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            PendingState::Waiting(rx) => Pin::new(rx)
                .poll(cx)
                .map(|received| received.unwrap_or(Err(LinkError::QueueClosed))),
            PendingState::Failed(error) => {
                Poll::Ready(Err(error.take().unwrap_or(LinkError::QueueClosed)))
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Write Queue
// ----------------------------------------------------------------------------

struct WriteJob {
    id: u64,
    bytes: Vec<u8>,
    done: oneshot::Sender<Result<WriteReport>>,
}

/// Single-worker FIFO in front of a [`Channel`]
pub struct WriteQueue {
    channel: Arc<dyn Channel>,
    jobs: mpsc::UnboundedSender<WriteJob>,
    next_id: AtomicU64,
}

impl WriteQueue {
    /// Start the worker task; must be called from within a tokio runtime
    ///
    /// Dropping the queue lets the worker drain what is already queued and
    /// then exit.
    pub fn new(channel: Arc<dyn Channel>, config: QueueConfig) -> Result<Self> {
        config.validate()?;
        let (jobs, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(channel.clone(), config, rx));
        Ok(Self {
            channel,
            jobs,
            next_id: AtomicU64::new(0),
        })
    }

    /// Append a message to the queue
    pub fn enqueue(&self, bytes: impl Into<Vec<u8>>) -> PendingWrite {
        let (done, rx) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let job = WriteJob {
            id,
            bytes: bytes.into(),
            done,
        };
        match self.jobs.send(job) {
            Ok(()) => PendingWrite {
                state: PendingState::Waiting(rx),
            },
            Err(_) => PendingWrite::failed(LinkError::QueueClosed),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }
}

impl CommandSink for WriteQueue {
    fn is_connected(&self) -> bool {
        WriteQueue::is_connected(self)
    }

    fn submit(&self, bytes: Vec<u8>) -> PendingWrite {
        self.enqueue(bytes)
    }
}

async fn run_worker(
    channel: Arc<dyn Channel>,
    config: QueueConfig,
    mut jobs: mpsc::UnboundedReceiver<WriteJob>,
) {
    while let Some(job) = jobs.recv().await {
        let result = send_message(channel.as_ref(), &config, job.id, &job.bytes).await;
        if let Err(e) = &result {
            warn!("Message {} failed: {}", job.id, e);
        }
        // the submitter may have stopped waiting
        let _ = job.done.send(result);
    }
    debug!("Write queue worker stopped");
}

async fn send_message(
    channel: &dyn Channel,
    config: &QueueConfig,
    id: u64,
    bytes: &[u8],
) -> Result<WriteReport> {
    if !channel.is_connected() {
        return Err(LinkError::NotConnected);
    }

    let line = codec::ensure_line_terminator(bytes);
    let total = codec::chunk_count(line.len(), config.max_chunk_size);
    let mut retries = 0;

    for (index, chunk) in codec::chunk(&line, config.max_chunk_size).enumerate() {
        if index > 0 && !config.chunk_delay.is_zero() {
            tokio::time::sleep(config.chunk_delay).await;
        }
        debug!(
            "Message {} chunk {}/{}: {}",
            id,
            index + 1,
            total,
            hex::encode(chunk)
        );
        retries += write_with_retry(channel, config, chunk).await?;
    }

    Ok(WriteReport {
        bytes: line.len(),
        chunks: total,
        retries,
    })
}

/// Write a chunk, retrying once on a busy adapter; returns retries used
async fn write_with_retry(
    channel: &dyn Channel,
    config: &QueueConfig,
    chunk: &[u8],
) -> Result<usize> {
    match channel.write(chunk).await {
        Ok(()) => Ok(0),
        Err(e) if e.is_transient() => {
            debug!("Channel busy, retrying in {:?}", config.busy_retry_delay);
            tokio::time::sleep(config.busy_retry_delay).await;
            channel.write(chunk).await.map(|()| 1)
        }
        Err(e) => Err(e),
    }
}
