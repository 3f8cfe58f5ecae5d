use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use crate::core::{JobDescriptor, JobResult, ProgressSink};
use crate::processing::batch::ResultAggregator;
use crate::worker::{JobError, JobExecutor, JobState};
use crate::worker::task::{execute_guarded, panic_message};

/// Tracks running jobs for one pool; decremented on drop.
struct ActiveSlot {
    active: Arc<AtomicUsize>,
}

impl ActiveSlot {
    fn enter(active: &Arc<AtomicUsize>, peak: &AtomicUsize) -> Self {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { active: Arc::clone(active) }
    }
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Moves `state` to `next`, keeping it unchanged if the move is not allowed.
fn step(id: &str, state: JobState, next: JobState) -> JobState {
    match state.advance(next) {
        Some(advanced) => {
            debug!("Job {} {:?} -> {:?}", id, state, advanced);
            advanced
        }
        None => {
            warn!("Job {} cannot move from {:?} to {:?}", id, state, next);
            state
        }
    }
}

/// Runs a chunk of jobs fully in parallel, one blocking task per job.
#[derive(Clone)]
pub struct WorkerPool {
    executor: Arc<dyn JobExecutor>,
    active_workers: Arc<AtomicUsize>,
    peak_workers: Arc<AtomicUsize>,
    worker_count: usize,
}

impl WorkerPool {
    pub fn new(executor: Arc<dyn JobExecutor>, worker_count: usize) -> Self {
        Self {
            executor,
            active_workers: Arc::new(AtomicUsize::new(0)),
            peak_workers: Arc::new(AtomicUsize::new(0)),
            worker_count,
        }
    }

    /// Jobs currently between start and release of their handle.
    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously running jobs seen so far.
    pub fn peak_workers(&self) -> usize {
        self.peak_workers.load(Ordering::SeqCst)
    }

    /// Executes every descriptor of `chunk` concurrently and waits for all of
    /// them. Returns one result per descriptor, in chunk order.
    ///
    /// Each completion is folded into `aggregator` under its lock and
    /// forwarded to `progress` before this returns.
    pub async fn run_chunk(
        &self,
        chunk: Vec<JobDescriptor>,
        aggregator: &Arc<Mutex<ResultAggregator>>,
        progress: &ProgressSink,
    ) -> Vec<JobResult> {
        if chunk.len() > self.worker_count {
            warn!(
                "Chunk of {} exceeds worker count {}; running anyway",
                chunk.len(),
                self.worker_count
            );
        }

        let mut handles = Vec::with_capacity(chunk.len());
        for descriptor in chunk {
            let job_id = descriptor.id.clone();
            let executor = Arc::clone(&self.executor);
            let active = Arc::clone(&self.active_workers);
            let peak = Arc::clone(&self.peak_workers);
            let aggregator = Arc::clone(aggregator);
            let progress = progress.clone();
            let recorded = Arc::new(AtomicBool::new(false));
            let recorded_by_job = Arc::clone(&recorded);

            let handle = tokio::spawn(async move {
                let id = descriptor.id.clone();
                let mut state = JobState::Pending;
                let started = Instant::now();

                let outcome = {
                    let _slot = ActiveSlot::enter(&active, &peak);
                    state = step(&id, state, JobState::Running);
                    tokio::task::spawn_blocking(move || execute_guarded(executor.as_ref(), &descriptor))
                        .await
                        .unwrap_or_else(|e| {
                            Err(if e.is_panic() {
                                JobError::Panicked(panic_message(e.into_panic().as_ref()))
                            } else {
                                JobError::Other(format!("Job {} was aborted", id))
                            })
                        })
                };
                let elapsed_ms = started.elapsed().as_millis() as u64;

                let (result, terminal) = match outcome {
                    Ok(output) => (JobResult::success(&id, output, elapsed_ms), JobState::Completed),
                    Err(e) => {
                        warn!("Job {} failed ({}): {}", id, e.kind(), e);
                        (JobResult::failure(&id, &e, elapsed_ms), JobState::Failed)
                    }
                };
                state = step(&id, state, terminal);
                debug_assert!(state.is_terminal(), "job {id} finished in {state:?}");

                aggregator.lock().await.accumulate(&result);
                recorded_by_job.store(true, Ordering::SeqCst);
                progress.job_completed(&result);
                result
            });
            handles.push((job_id, recorded, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (id, recorded, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    let error = JobError::Panicked(e.to_string());
                    warn!("Job task for {} ended abnormally: {}", id, e);
                    let result = JobResult::failure(&id, &error, 0);
                    // Count it only if the task died before reaching the aggregator
                    if !recorded.load(Ordering::SeqCst) {
                        aggregator.lock().await.accumulate(&result);
                        progress.job_completed(&result);
                    }
                    result
                }
            };
            results.push(result);
        }
        results
    }
}
