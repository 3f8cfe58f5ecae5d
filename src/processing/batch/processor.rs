use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use crate::core::{ChunkProgress, JobDescriptor, JobResult, NoopReporter, ProgressDispatcher, ProgressReporter};
use crate::processing::batch::{BatchSummary, ResultAggregator};
use crate::utils::{BatchResult, ConfigurationError, validate_concurrency, validate_descriptors};
use crate::worker::{JobExecutor, WorkerPool};

const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Runs `descriptors` through `execute`, at most `concurrency_limit` at a time.
///
/// Jobs are split into consecutive chunks of `concurrency_limit`; every job of
/// a chunk runs in parallel and the next chunk starts only after the whole
/// chunk has finished. A job error or panic becomes a `Failure` result and
/// never stops the batch.
pub async fn run_batch<E: JobExecutor>(
    descriptors: Vec<JobDescriptor>,
    concurrency_limit: usize,
    execute: E,
) -> BatchResult<BatchSummary> {
    BatchProcessor::builder()
        .concurrency(concurrency_limit)
        .executor(execute)
        .build()?
        .process_batch(descriptors)
        .await
}

/// Builder for [`BatchProcessor`]. `concurrency` and `executor` are required.
pub struct BatchProcessorBuilder {
    concurrency: Option<usize>,
    executor: Option<Arc<dyn JobExecutor>>,
    reporter: Arc<dyn ProgressReporter>,
    flush_timeout: Duration,
}

impl BatchProcessorBuilder {
    pub fn concurrency(mut self, limit: usize) -> Self {
        self.concurrency = Some(limit);
        self
    }

    pub fn executor<E: JobExecutor>(mut self, executor: E) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    pub fn shared_executor(mut self, executor: Arc<dyn JobExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn reporter<R: ProgressReporter>(mut self, reporter: R) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    pub fn shared_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<BatchProcessor, ConfigurationError> {
        let concurrency = self.concurrency.unwrap_or(0);
        validate_concurrency(concurrency)?;
        let executor = self.executor.ok_or(ConfigurationError::MissingExecutor)?;

        debug!("Creating BatchProcessor with chunk size of {}", concurrency);
        Ok(BatchProcessor {
            chunk_size: concurrency,
            pool: WorkerPool::new(executor, concurrency),
            reporter: self.reporter,
            flush_timeout: self.flush_timeout,
        })
    }
}

/// Bounded-concurrency batch scheduler.
pub struct BatchProcessor {
    chunk_size: usize,
    pool: WorkerPool,
    reporter: Arc<dyn ProgressReporter>,
    flush_timeout: Duration,
}

impl BatchProcessor {
    pub fn builder() -> BatchProcessorBuilder {
        BatchProcessorBuilder {
            concurrency: None,
            executor: None,
            reporter: Arc::new(NoopReporter),
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
        }
    }

    /// Highest number of jobs that ran at the same time across all batches
    /// processed so far.
    pub fn peak_concurrency(&self) -> usize {
        self.pool.peak_workers()
    }

    /// Creates chunks of descriptors for batch processing
    fn create_chunks(&self, descriptors: Vec<JobDescriptor>) -> Vec<Vec<JobDescriptor>> {
        let mut chunks = Vec::with_capacity(descriptors.len().div_ceil(self.chunk_size));
        let mut iter = descriptors.into_iter().peekable();
        while iter.peek().is_some() {
            chunks.push(iter.by_ref().take(self.chunk_size).collect());
        }
        chunks
    }

    /// Processes a batch chunk by chunk, reporting progress at every chunk
    /// boundary. Returns once every descriptor has a result.
    pub async fn process_batch(&self, descriptors: Vec<JobDescriptor>) -> BatchResult<BatchSummary> {
        validate_descriptors(&descriptors)?;

        let total_jobs = descriptors.len();
        let started = Instant::now();
        let chunks = self.create_chunks(descriptors);
        let chunk_count = chunks.len();
        info!(
            "Processing batch of {} jobs in {} chunks (concurrency {})",
            total_jobs, chunk_count, self.chunk_size
        );

        let aggregator = Arc::new(Mutex::new(ResultAggregator::new()));
        let dispatcher = ProgressDispatcher::start(Arc::clone(&self.reporter));
        let sink = dispatcher.sink();
        let mut all_results: Vec<JobResult> = Vec::with_capacity(total_jobs);

        for (chunk_index, chunk) in chunks.into_iter().enumerate() {
            // Only log at important milestones to reduce noise
            if chunk_index == 0 || chunk_index + 1 == chunk_count || chunk_index % 5 == 0 {
                debug!("Processing chunk {}/{} ({} jobs)", chunk_index + 1, chunk_count, chunk.len());
            }

            let results = self.pool.run_chunk(chunk, &aggregator, &sink).await;
            all_results.extend(results);

            let progress = {
                let agg = aggregator.lock().await;
                ChunkProgress::new(
                    chunk_index + 1,
                    chunk_count,
                    all_results.len(),
                    total_jobs,
                    agg.succeeded(),
                    agg.failed(),
                )
            };
            sink.chunk_completed(progress);
        }

        drop(sink);
        dispatcher.shutdown(self.flush_timeout).await;

        let summary = aggregator.lock().await.finalize(started.elapsed(), all_results)?;

        if summary.failed > 0 {
            warn!(
                "Batch processing completed with {} failed jobs out of {}",
                summary.failed, summary.total
            );
        } else {
            info!(
                "Batch processing completed successfully: {} jobs processed in {}ms",
                summary.total, summary.elapsed_ms
            );
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::core::{JobOptions, JobOutput};
    use crate::utils::BatchError;
    use crate::worker::{JobError, JobErrorKind, JobOutcome};

    fn descriptors(n: usize) -> Vec<JobDescriptor> {
        (0..n)
            .map(|i| {
                let id = format!("job-{i}");
                JobDescriptor::new(id.clone(), format!("{id}.png"), "/out", JobOptions::default())
            })
            .collect()
    }

    fn named(ids: &[&str]) -> Vec<JobDescriptor> {
        ids.iter()
            .map(|id| JobDescriptor::new(*id, format!("{id}.png"), "/out", JobOptions::default()))
            .collect()
    }

    fn succeed(_: &JobDescriptor) -> JobOutcome<JobOutput> {
        Ok(JobOutput { input_size_bytes: 100, ..Default::default() })
    }

    #[derive(Default)]
    struct RecordingReporter {
        chunks: StdMutex<Vec<ChunkProgress>>,
        jobs: AtomicUsize,
    }

    impl ProgressReporter for Arc<RecordingReporter> {
        fn on_chunk_complete(&self, progress: &ChunkProgress) -> Result<(), String> {
            self.chunks.lock().unwrap().push(progress.clone());
            Ok(())
        }

        fn on_job_complete(&self, _result: &JobResult) -> Result<(), String> {
            self.jobs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Records the running high-water mark and chunk membership of each job.
    #[derive(Default)]
    struct Instrumented {
        running: AtomicUsize,
        high_water: AtomicUsize,
        events: StdMutex<Vec<(String, &'static str)>>,
    }

    impl Instrumented {
        fn run(&self, d: &JobDescriptor) -> JobOutcome<JobOutput> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.high_water.fetch_max(now, Ordering::SeqCst);
            self.events.lock().unwrap().push((d.id.clone(), "start"));
            std::thread::sleep(Duration::from_millis(15));
            self.events.lock().unwrap().push((d.id.clone(), "end"));
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(JobOutput::default())
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn every_descriptor_gets_exactly_one_result() {
        let input = descriptors(7);
        let summary = run_batch(input.clone(), 3, succeed).await.unwrap();

        assert_eq!(summary.results.len(), input.len());
        for (descriptor, result) in input.iter().zip(&summary.results) {
            assert_eq!(descriptor.id, result.id());
        }
        assert_eq!(summary.succeeded + summary.failed, summary.total);
        assert_eq!((summary.total, summary.succeeded, summary.failed), (7, 7, 0));
        assert_eq!(summary.total_input_bytes, 700);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrency_never_exceeds_limit() {
        let instrumented = Arc::new(Instrumented::default());
        let executor = {
            let instrumented = Arc::clone(&instrumented);
            move |d: &JobDescriptor| instrumented.run(d)
        };

        let processor = BatchProcessor::builder()
            .concurrency(3)
            .executor(executor)
            .build()
            .unwrap();
        let summary = processor.process_batch(descriptors(10)).await.unwrap();

        assert_eq!(summary.succeeded, 10);
        assert!(instrumented.high_water.load(Ordering::SeqCst) <= 3);
        assert!(processor.peak_concurrency() <= 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn next_chunk_waits_for_previous_chunk() {
        let instrumented = Arc::new(Instrumented::default());
        let executor = {
            let instrumented = Arc::clone(&instrumented);
            move |d: &JobDescriptor| instrumented.run(d)
        };

        run_batch(descriptors(5), 2, executor).await.unwrap();

        let events = instrumented.events.lock().unwrap().clone();
        let position = |id: &str, kind: &str| {
            events.iter().position(|(i, k)| i == id && *k == kind).unwrap()
        };
        let chunks = [vec!["job-0", "job-1"], vec!["job-2", "job-3"], vec!["job-4"]];
        for pair in chunks.windows(2) {
            let last_end = pair[0].iter().map(|id| position(id, "end")).max().unwrap();
            let first_start = pair[1].iter().map(|id| position(id, "start")).min().unwrap();
            assert!(last_end < first_start, "chunk started before previous chunk drained");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn one_failure_is_isolated() {
        let executor = |d: &JobDescriptor| -> JobOutcome<JobOutput> {
            if d.id == "job-3" {
                return Err(JobError::decode("corrupt header"));
            }
            succeed(d)
        };

        let summary = run_batch(descriptors(6), 4, executor).await.unwrap();
        assert_eq!(summary.succeeded, 5);
        assert_eq!(summary.failed, 1);
        let failures: Vec<&JobResult> = summary.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].id(), "job-3");
        for result in summary.results.iter().filter(|r| r.id() != "job-3") {
            assert!(matches!(result, JobResult::Success { input_size_bytes: 100, .. }));
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rerunning_the_same_list_always_succeeds() {
        let input = descriptors(4);
        for _ in 0..2 {
            let summary = run_batch(input.clone(), 2, succeed).await.unwrap();
            assert_eq!(summary.succeeded, summary.total);
            assert_eq!(summary.failed, 0);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn five_jobs_limit_two_fires_three_chunk_events() {
        let reporter = Arc::new(RecordingReporter::default());
        let processor = BatchProcessor::builder()
            .concurrency(2)
            .executor(succeed)
            .reporter(Arc::clone(&reporter))
            .build()
            .unwrap();

        processor.process_batch(descriptors(5)).await.unwrap();

        let chunks = reporter.chunks.lock().unwrap().clone();
        assert_eq!(chunks.len(), 3);
        let completed: Vec<usize> = chunks.iter().map(|c| c.completed).collect();
        assert_eq!(completed, vec![2, 4, 5]);
        assert_eq!(chunks[2].progress_percentage, 100);
        assert!(chunks.iter().all(|c| c.chunk_count == 3 && c.total == 5));
        assert_eq!(reporter.jobs.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn decode_failure_example() {
        let executor = |d: &JobDescriptor| -> JobOutcome<JobOutput> {
            std::thread::sleep(Duration::from_millis(10));
            if d.id == "B" {
                return Err(JobError::decode("decode failed"));
            }
            Ok(JobOutput::default())
        };

        let summary = run_batch(named(&["A", "B", "C"]), 2, executor).await.unwrap();
        assert_eq!((summary.total, summary.succeeded, summary.failed), (3, 2, 1));

        match summary.result_for("B").unwrap() {
            JobResult::Failure { id, error_kind, error_message, .. } => {
                assert_eq!(id, "B");
                assert_eq!(*error_kind, JobErrorKind::Decode);
                assert_eq!(error_message, "decode failed");
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_batch_completes_without_events() {
        let reporter = Arc::new(RecordingReporter::default());
        let processor = BatchProcessor::builder()
            .concurrency(4)
            .executor(succeed)
            .reporter(Arc::clone(&reporter))
            .build()
            .unwrap();

        let summary = processor.process_batch(Vec::new()).await.unwrap();
        assert_eq!(summary.total, 0);
        assert!(summary.results.is_empty());
        assert!(reporter.chunks.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn configuration_errors_stop_the_batch_before_any_job() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counting = {
            let calls = Arc::clone(&calls);
            move |d: &JobDescriptor| {
                calls.fetch_add(1, Ordering::SeqCst);
                succeed(d)
            }
        };

        let err = run_batch(descriptors(2), 0, counting.clone()).await.unwrap_err();
        assert!(matches!(
            err,
            BatchError::Configuration(ConfigurationError::InvalidConcurrency(0))
        ));

        let err = BatchProcessor::builder().concurrency(2).build().err().unwrap();
        assert_eq!(err, ConfigurationError::MissingExecutor);

        let mut bad = descriptors(3);
        bad[2].id.clear();
        let err = run_batch(bad, 2, counting).await.unwrap_err();
        assert!(matches!(
            err,
            BatchError::Configuration(ConfigurationError::MalformedDescriptor { index: 2, .. })
        ));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reporter_failures_do_not_abort_the_batch() {
        struct Broken;
        impl ProgressReporter for Broken {
            fn on_chunk_complete(&self, _progress: &ChunkProgress) -> Result<(), String> {
                Err("terminal closed".to_string())
            }
            fn on_job_complete(&self, _result: &JobResult) -> Result<(), String> {
                panic!("renderer crashed");
            }
        }

        let processor = BatchProcessor::builder()
            .concurrency(2)
            .executor(succeed)
            .reporter(Broken)
            .build()
            .unwrap();
        let summary = processor.process_batch(descriptors(3)).await.unwrap();
        assert_eq!(summary.succeeded, 3);
    }
}
