use std::fmt;
use crate::core::JobResult;
use crate::processing::BatchSummary;

/// Human-readable end-of-batch report.
pub struct SummaryReport<'a> {
    summary: &'a BatchSummary,
    concurrency: Option<usize>,
}

impl<'a> SummaryReport<'a> {
    pub fn new(summary: &'a BatchSummary) -> Self {
        Self { summary, concurrency: None }
    }

    /// Adds the concurrency limit the batch ran with.
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = Some(limit);
        self
    }

    fn safe_div(numerator: f64, denominator: f64) -> f64 {
        if denominator == 0.0 {
            0.0
        } else {
            numerator / denominator
        }
    }

    pub(crate) fn format_bytes(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.2} GB", Self::safe_div(bytes as f64, GB as f64))
        } else if bytes >= MB {
            format!("{:.2} MB", Self::safe_div(bytes as f64, MB as f64))
        } else if bytes >= KB {
            format!("{:.2} KB", Self::safe_div(bytes as f64, KB as f64))
        } else {
            format!("{} B", bytes)
        }
    }

    pub(crate) fn format_duration(ms: u64) -> String {
        let seconds = ms as f64 / 1000.0;
        if seconds >= 60.0 {
            let minutes = (seconds / 60.0).floor();
            format!("{:.0}m {:.2}s", minutes, seconds % 60.0)
        } else {
            format!("{:.2}s", seconds)
        }
    }

    fn output_bytes(&self) -> u64 {
        self.summary
            .results
            .iter()
            .map(|r| match r {
                JobResult::Success { outputs, .. } => outputs.iter().map(|o| o.size_bytes).sum(),
                JobResult::Failure { .. } => 0,
            })
            .sum()
    }
}

impl fmt::Display for SummaryReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.summary;
        writeln!(f, "=== Image Batch Report ===")?;
        writeln!(f)?;

        writeln!(f, "Jobs:")?;
        writeln!(f, "- Total: {}", s.total)?;
        writeln!(f, "- Succeeded: {} ({:.1}%)", s.succeeded, s.success_rate())?;
        writeln!(f, "- Failed: {}", s.failed)?;
        if let Some(limit) = self.concurrency {
            writeln!(f, "- Concurrency: {}", limit)?;
        }
        writeln!(f)?;

        writeln!(f, "Time-based Metrics:")?;
        writeln!(f, "- Wall Clock: {}", Self::format_duration(s.elapsed_ms))?;
        writeln!(f, "- Summed Processing Time: {}", Self::format_duration(s.total_processing_time_ms))?;
        match s.average_processing_time_ms {
            Some(avg) => writeln!(f, "- Average Processing Time: {:.1}ms/image", avg)?,
            None => writeln!(f, "- Average Processing Time: n/a")?,
        }
        writeln!(f, "- Processing Throughput: {:.2} MB/s", s.throughput_mb_per_sec())?;
        writeln!(f)?;

        writeln!(f, "Sizes:")?;
        writeln!(f, "  └── Input: {}", Self::format_bytes(s.total_input_bytes))?;
        writeln!(f, "  └── Output: {}", Self::format_bytes(self.output_bytes()))?;

        if !s.source_tags.is_empty() {
            let tags: Vec<&str> = s.source_tags.iter().map(String::as_str).collect();
            writeln!(f, "- Sources: {}", tags.join(", "))?;
        }

        if s.failed > 0 {
            writeln!(f)?;
            writeln!(f, "Failures:")?;
            for result in s.failures() {
                if let JobResult::Failure { id, error_kind, error_message, .. } = result {
                    writeln!(f, "  └── {} [{}]: {}", id, error_kind, error_message)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;
    use crate::core::{OutputArtifact, Resolution};
    use crate::worker::JobErrorKind;

    fn summary() -> BatchSummary {
        BatchSummary {
            total: 2,
            succeeded: 1,
            failed: 1,
            total_processing_time_ms: 1500,
            total_input_bytes: 2 * 1024 * 1024,
            source_tags: BTreeSet::from(["jpeg".to_string()]),
            elapsed_ms: 90_500,
            average_processing_time_ms: Some(1200.0),
            throughput_bytes_per_sec: 1024.0 * 1024.0,
            results: vec![
                JobResult::Success {
                    id: "a.jpg".into(),
                    outputs: vec![OutputArtifact {
                        label: "tiff".into(),
                        path: PathBuf::from("/out/a.tiff"),
                        size_bytes: 2048,
                    }],
                    processing_time_ms: 1200,
                    input_size_bytes: 2 * 1024 * 1024,
                    source_tag: Some("jpeg".into()),
                    resolution: Some(Resolution { width: 6000, height: 4000 }),
                },
                JobResult::Failure {
                    id: "b.jpg".into(),
                    error_kind: JobErrorKind::Decode,
                    error_message: "decode failed".into(),
                    processing_time_ms: 300,
                },
            ],
        }
    }

    #[test]
    fn byte_formatting_picks_units() {
        assert_eq!(SummaryReport::format_bytes(512), "512 B");
        assert_eq!(SummaryReport::format_bytes(2048), "2.00 KB");
        assert_eq!(SummaryReport::format_bytes(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn durations_switch_to_minutes() {
        assert_eq!(SummaryReport::format_duration(1500), "1.50s");
        assert_eq!(SummaryReport::format_duration(90_500), "1m 30.50s");
    }

    #[test]
    fn report_lists_counts_and_failures() {
        let summary = summary();
        let text = SummaryReport::new(&summary).with_concurrency(4).to_string();

        assert!(text.contains("- Succeeded: 1 (50.0%)"));
        assert!(text.contains("- Concurrency: 4"));
        assert!(text.contains("- Wall Clock: 1m 30.50s"));
        assert!(text.contains("Input: 2.00 MB"));
        assert!(text.contains("Output: 2.00 KB"));
        assert!(text.contains("b.jpg [decode]: decode failed"));
    }

    #[test]
    fn empty_batch_has_no_average() {
        let summary = BatchSummary {
            total: 0,
            succeeded: 0,
            failed: 0,
            total_processing_time_ms: 0,
            total_input_bytes: 0,
            source_tags: BTreeSet::new(),
            elapsed_ms: 0,
            average_processing_time_ms: None,
            throughput_bytes_per_sec: 0.0,
            results: Vec::new(),
        };
        let text = SummaryReport::new(&summary).to_string();
        assert!(text.contains("Average Processing Time: n/a"));
        assert!(!text.contains("Failures:"));
    }
}
