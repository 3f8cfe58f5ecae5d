use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use crate::core::JobResult;

/// Progress snapshot emitted after each chunk drains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkProgress {
    /// 1-based index of the chunk that just finished
    pub chunk_index: usize,
    pub chunk_count: usize,
    /// Jobs finished so far, across all chunks
    pub completed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Progress percentage (0-100)
    pub progress_percentage: usize,
}

impl ChunkProgress {
    pub fn new(
        chunk_index: usize,
        chunk_count: usize,
        completed: usize,
        total: usize,
        succeeded: usize,
        failed: usize,
    ) -> Self {
        let progress_percentage = if total > 0 {
            (completed * 100) / total
        } else {
            0
        };

        Self {
            chunk_index,
            chunk_count,
            completed,
            total,
            succeeded,
            failed,
            progress_percentage,
        }
    }
}

/// Receives progress notifications from the scheduler.
///
/// Calls happen on a background task. An `Err` (or a panic) is logged and
/// otherwise ignored; it never affects the batch.
pub trait ProgressReporter: Send + Sync + 'static {
    fn on_chunk_complete(&self, progress: &ChunkProgress) -> Result<(), String>;

    fn on_job_complete(&self, _result: &JobResult) -> Result<(), String> {
        Ok(())
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_chunk_complete(&self, _progress: &ChunkProgress) -> Result<(), String> {
        Ok(())
    }
}

/// Writes progress lines through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn on_chunk_complete(&self, p: &ChunkProgress) -> Result<(), String> {
        info!(
            "Progress: {}/{} ({}%) | ok {} | failed {} | chunk {}/{}",
            p.completed, p.total, p.progress_percentage, p.succeeded, p.failed,
            p.chunk_index, p.chunk_count
        );
        Ok(())
    }

    fn on_job_complete(&self, result: &JobResult) -> Result<(), String> {
        match result {
            JobResult::Success { id, outputs, processing_time_ms, source_tag, resolution, .. } => {
                let labels: Vec<String> = outputs
                    .iter()
                    .map(|o| format!("{} {:.1}KB", o.label, o.size_bytes as f64 / 1024.0))
                    .collect();
                let source = source_tag.as_deref().unwrap_or("unknown source");
                match resolution {
                    Some(r) => info!(
                        "✓ {} [{}] ({}ms) | {} | {}",
                        id, labels.join(", "), processing_time_ms, source, r
                    ),
                    None => info!("✓ {} [{}] ({}ms) | {}", id, labels.join(", "), processing_time_ms, source),
                }
            }
            JobResult::Failure { id, error_message, .. } => {
                warn!("✗ {}: {}", id, error_message);
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
enum ProgressEvent {
    Job(JobResult),
    Chunk(ChunkProgress),
}

/// Cloneable handle for pushing events into a [`ProgressDispatcher`].
#[derive(Clone)]
pub struct ProgressSink {
    sender: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressSink {
    pub fn job_completed(&self, result: &JobResult) {
        self.send(ProgressEvent::Job(result.clone()));
    }

    pub fn chunk_completed(&self, progress: ChunkProgress) {
        self.send(ProgressEvent::Chunk(progress));
    }

    fn send(&self, event: ProgressEvent) {
        if self.sender.send(event).is_err() {
            debug!("Progress dispatcher already stopped; event dropped");
        }
    }
}

/// Forwards events to a reporter on its own task so the scheduler never
/// waits on reporting.
pub struct ProgressDispatcher {
    sink: ProgressSink,
    worker: JoinHandle<()>,
}

impl ProgressDispatcher {
    /// Starts the forwarding task. Must be called inside a tokio runtime.
    pub fn start(reporter: Arc<dyn ProgressReporter>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<ProgressEvent>();

        let worker = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                let outcome = catch_unwind(AssertUnwindSafe(|| match &event {
                    ProgressEvent::Job(result) => reporter.on_job_complete(result),
                    ProgressEvent::Chunk(progress) => reporter.on_chunk_complete(progress),
                }));

                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!("Progress reporter failed: {}", e),
                    Err(_) => warn!("Progress reporter panicked while handling {:?}", event),
                }
            }
            debug!("Progress dispatcher drained");
        });

        Self {
            sink: ProgressSink { sender },
            worker,
        }
    }

    pub fn sink(&self) -> ProgressSink {
        self.sink.clone()
    }

    /// Closes the channel and gives the reporter up to `timeout` to catch up.
    ///
    /// Sinks still held elsewhere keep the channel open; drop them first.
    pub async fn shutdown(self, timeout: Duration) {
        let Self { sink, worker } = self;
        drop(sink);

        let abort = worker.abort_handle();
        match tokio::time::timeout(timeout, worker).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Progress dispatcher task ended abnormally: {}", e),
            Err(_) => {
                warn!("Progress reporter did not drain within {:?}; detaching", timeout);
                abort.abort();
            }
        }
    }
}
