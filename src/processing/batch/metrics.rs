use std::collections::BTreeSet;
use std::time::Duration;
use serde::Serialize;
use tracing::{debug, error};
use crate::core::JobResult;
use crate::utils::{BatchError, BatchResult};

/// Running totals over the results of one batch.
///
/// Shared between the jobs of a chunk behind a mutex; each completion calls
/// [`accumulate`](Self::accumulate) exactly once.
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    total: usize,
    succeeded: usize,
    failed: usize,
    total_processing_time_ms: u64,
    total_input_bytes: u64,
    source_tags: BTreeSet<String>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate(&mut self, result: &JobResult) {
        self.total += 1;
        self.total_processing_time_ms += result.processing_time_ms();

        match result {
            JobResult::Success { input_size_bytes, source_tag, .. } => {
                self.succeeded += 1;
                self.total_input_bytes += input_size_bytes;
                if let Some(tag) = source_tag {
                    self.source_tags.insert(tag.clone());
                }
            }
            JobResult::Failure { .. } => {
                self.failed += 1;
            }
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Produces the immutable summary.
    ///
    /// `elapsed` is the wall-clock time of the whole batch; `results` are the
    /// per-job results in submission order, one per accumulated job.
    pub fn finalize(&self, elapsed: Duration, results: Vec<JobResult>) -> BatchResult<BatchSummary> {
        if self.succeeded + self.failed != self.total || results.len() != self.total {
            error!(
                "Aggregation invariant violated: {} + {} vs {} accumulated, {} results",
                self.succeeded,
                self.failed,
                self.total,
                results.len()
            );
            return Err(BatchError::AggregationInvariant {
                total: self.total,
                succeeded: self.succeeded,
                failed: self.failed,
                recorded: results.len(),
            });
        }

        let average_processing_time_ms = if self.succeeded > 0 {
            Some(self.total_processing_time_ms as f64 / self.succeeded as f64)
        } else {
            None
        };

        let elapsed_secs = elapsed.as_secs_f64();
        let throughput_bytes_per_sec = if elapsed_secs > 0.0 {
            self.total_input_bytes as f64 / elapsed_secs
        } else {
            0.0
        };

        debug!(
            "Finalized batch: {} total, {} ok, {} failed, {:.2} MB/s",
            self.total,
            self.succeeded,
            self.failed,
            throughput_bytes_per_sec / (1024.0 * 1024.0)
        );

        Ok(BatchSummary {
            total: self.total,
            succeeded: self.succeeded,
            failed: self.failed,
            total_processing_time_ms: self.total_processing_time_ms,
            total_input_bytes: self.total_input_bytes,
            source_tags: self.source_tags.clone(),
            elapsed_ms: elapsed.as_millis() as u64,
            average_processing_time_ms,
            throughput_bytes_per_sec,
            results,
        })
    }
}

/// Aggregate outcome of a batch. Owned by the caller once returned.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Sum of per-job processing time, failures included
    pub total_processing_time_ms: u64,
    /// Input bytes of successful jobs
    pub total_input_bytes: u64,
    pub source_tags: BTreeSet<String>,
    /// Wall-clock time of the whole batch
    pub elapsed_ms: u64,
    /// Total processing time divided by successful jobs; `None` when nothing succeeded
    pub average_processing_time_ms: Option<f64>,
    pub throughput_bytes_per_sec: f64,
    /// One result per descriptor, in submission order
    pub results: Vec<JobResult>,
}

impl BatchSummary {
    pub fn failures(&self) -> impl Iterator<Item = &JobResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn result_for(&self, id: &str) -> Option<&JobResult> {
        self.results.iter().find(|r| r.id() == id)
    }

    pub fn throughput_mb_per_sec(&self) -> f64 {
        self.throughput_bytes_per_sec / (1024.0 * 1024.0)
    }

    /// Percentage of jobs that succeeded (0 for an empty batch)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.succeeded as f64 * 100.0 / self.total as f64
        }
    }
}
