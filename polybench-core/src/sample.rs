//! Raw Samples
//!
//! One `RawSample` is produced per executed iteration, whether the process
//! succeeded, exited non-zero, timed out or never started. Failed samples
//! always carry a `FailureKind` and a human-readable error string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Why an iteration did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// Compiler or interpreter missing from the execution path
    ToolchainUnavailable,
    /// Build tool failed or produced no binary
    BuildFailed,
    /// Prepared executable is missing or lacks execute permission
    MissingExecutable,
    /// The operating system refused to start the process
    SpawnFailed,
    /// Deadline elapsed before the process exited
    Timeout,
    /// Process exited with a non-zero status (`None` when killed by a signal)
    NonZeroExit {
        /// Exit code if one was reported
        code: Option<i32>,
    },
}

impl FailureKind {
    /// Failures that stop every remaining iteration of a (test, variant) pair
    pub fn is_fatal_for_variant(&self) -> bool {
        matches!(
            self,
            FailureKind::ToolchainUnavailable | FailureKind::BuildFailed
        )
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::ToolchainUnavailable => write!(f, "toolchain unavailable"),
            FailureKind::BuildFailed => write!(f, "build failure"),
            FailureKind::MissingExecutable => write!(f, "missing executable"),
            FailureKind::SpawnFailed => write!(f, "spawn failure"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::NonZeroExit { code: Some(code) } => write!(f, "exit code {}", code),
            FailureKind::NonZeroExit { code: None } => write!(f, "terminated by signal"),
        }
    }
}

/// Measurements captured for one execution, before it is labelled
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleOutcome {
    /// Wall-clock time from spawn to exit
    pub duration: Duration,
    /// Peak resident memory observed, 0 when never sampled
    pub peak_memory_bytes: u64,
    /// Mean CPU utilisation over all sample points, 0 when never sampled
    pub avg_cpu_percent: f64,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

/// One executed iteration of one variant on one test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Test name
    pub test: String,
    /// Variant name
    pub variant: String,
    /// Iteration index, counted from 0
    pub iteration: u32,
    /// Wall-clock time from spawn to exit, or the deadline on timeout
    pub duration: Duration,
    /// Peak resident memory, 0 when never sampled
    pub peak_memory_bytes: u64,
    /// Mean CPU utilisation in percent of one core, 0 when never sampled
    pub avg_cpu_percent: f64,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// Whether the process started and exited with status 0
    pub success: bool,
    /// Failure category, `None` on success
    pub failure: Option<FailureKind>,
    /// Human-readable diagnostic, `None` on success
    pub error: Option<String>,
    /// When the sample was labelled
    pub timestamp: DateTime<Utc>,
}

impl RawSample {
    /// Label a successful execution
    pub fn succeeded(
        test: impl Into<String>,
        variant: impl Into<String>,
        iteration: u32,
        outcome: SampleOutcome,
    ) -> Self {
        Self::assemble(test.into(), variant.into(), iteration, outcome, None)
    }

    /// Label a failed execution. `error` should preserve tool or process
    /// diagnostics verbatim when there are any.
    pub fn failed(
        test: impl Into<String>,
        variant: impl Into<String>,
        iteration: u32,
        kind: FailureKind,
        error: impl Into<String>,
        outcome: SampleOutcome,
    ) -> Self {
        let mut error = error.into();
        if error.is_empty() {
            error = kind.to_string();
        }
        Self::assemble(
            test.into(),
            variant.into(),
            iteration,
            outcome,
            Some((kind, error)),
        )
    }

    fn assemble(
        test: String,
        variant: String,
        iteration: u32,
        outcome: SampleOutcome,
        failure: Option<(FailureKind, String)>,
    ) -> Self {
        let (failure, error) = match failure {
            Some((kind, error)) => (Some(kind), Some(error)),
            None => (None, None),
        };
        Self {
            test,
            variant,
            iteration,
            duration: outcome.duration,
            peak_memory_bytes: outcome.peak_memory_bytes,
            avg_cpu_percent: outcome.avg_cpu_percent,
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            success: failure.is_none(),
            failure,
            error,
            timestamp: Utc::now(),
        }
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.duration.as_secs_f64()
    }

    /// Whether the iteration was cut short by its deadline
    pub fn timed_out(&self) -> bool {
        matches!(self.failure, Some(FailureKind::Timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_succeeded_has_no_error() {
        let sample = RawSample::succeeded(
            "quicksort",
            "rust",
            3,
            SampleOutcome {
                duration: Duration::from_millis(250),
                peak_memory_bytes: 4096,
                ..Default::default()
            },
        );

        assert!(sample.success);
        assert!(sample.failure.is_none());
        assert!(sample.error.is_none());
        assert!((sample.duration_secs() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_failed_always_has_error_text() {
        let sample = RawSample::failed(
            "quicksort",
            "go",
            0,
            FailureKind::NonZeroExit { code: Some(2) },
            "",
            SampleOutcome::default(),
        );

        assert!(!sample.success);
        assert_eq!(sample.error.as_deref(), Some("exit code 2"));
    }

    #[test]
    fn test_timeout_detection() {
        let sample = RawSample::failed(
            "t",
            "v",
            0,
            FailureKind::Timeout,
            "Timeout after 1s",
            SampleOutcome {
                duration: Duration::from_secs(1),
                ..Default::default()
            },
        );
        assert!(sample.timed_out());
        assert_eq!(sample.duration, Duration::from_secs(1));
    }

    #[test]
    fn test_fatal_kinds() {
        assert!(FailureKind::BuildFailed.is_fatal_for_variant());
        assert!(FailureKind::ToolchainUnavailable.is_fatal_for_variant());
        assert!(!FailureKind::Timeout.is_fatal_for_variant());
        assert!(!FailureKind::SpawnFailed.is_fatal_for_variant());
    }

    #[test]
    fn test_failure_kind_serializes_tagged() {
        let json = serde_json::to_string(&FailureKind::NonZeroExit { code: Some(1) }).unwrap();
        assert_eq!(json, r#"{"kind":"non_zero_exit","code":1}"#);
    }
}
