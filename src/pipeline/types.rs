use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::constants::{HALLUCINATION_WARNING, ScoringLimits};
use crate::paper::ScoredPaper;

/// Per-batch progress of a run. `CallingModel` may loop internally under the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Batching,
    CallingModel,
    Parsing,
    Filtering,
    Done,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Batching => "batching",
            RunState::CallingModel => "calling_model",
            RunState::Parsing => "parsing",
            RunState::Filtering => "filtering",
            RunState::Done => "done",
        };
        f.write_str(s)
    }
}

/// What the run does when a batch fails after its retry policy gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchFailurePolicy {
    /// Fail the whole run; no partial digest.
    #[default]
    Abort,
    /// Record the failure in the run report and continue with the remaining batches.
    Skip,
}

impl std::str::FromStr for BatchFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "skip" => Ok(Self::Skip),
            _ => Err(format!("Unknown batch failure policy: {}", s)),
        }
    }
}

/// Run-level knobs of the [`super::Pipeline`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub limits: ScoringLimits,
    /// Batches in flight at once; results are merged in input order regardless.
    pub concurrency: usize,
    pub on_batch_failure: BatchFailurePolicy,
    /// Wall-clock budget for the whole run.
    pub run_timeout: Option<Duration>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            limits: ScoringLimits::default(),
            concurrency: 1,
            on_batch_failure: BatchFailurePolicy::Abort,
            run_timeout: None,
        }
    }
}

impl PipelineOptions {
    pub fn with_limits(mut self, limits: ScoringLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_failure_policy(mut self, policy: BatchFailurePolicy) -> Self {
        self.on_batch_failure = policy;
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }
}

/// Outcome of one batch, kept in the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub index: usize,
    pub papers: usize,
    pub fingerprint: String,
    /// Records recovered from the response.
    pub parsed: usize,
    /// Records surviving title verification.
    pub verified: usize,
    pub hallucinated: bool,
    /// Set when the batch failed and was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunStats {
    pub input_papers: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub verified: usize,
    pub selected: usize,
}

/// Result of one pipeline run, ready for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct DigestRun {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub threshold: u8,
    /// Selected papers, highest score first; ties keep input order.
    pub papers: Vec<ScoredPaper>,
    /// `true` if any batch returned a record for a paper it was not given.
    pub hallucination_detected: bool,
    pub stats: RunStats,
    pub batches: Vec<BatchReport>,
}

impl DigestRun {
    /// Warning to render ahead of the digest, if any.
    pub fn warning(&self) -> Option<&'static str> {
        self.hallucination_detected.then_some(HALLUCINATION_WARNING)
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }
}
