//! Pipeline orchestrator: batch → call → parse → verify → accumulate, then threshold.
//!
//! Batches may run concurrently (`PipelineOptions::concurrency`), but results are always
//! merged in batch order and the run-level hallucination flag is the OR of every batch's flag.
//! A batch that fails after its retry policy gives up aborts the run unless
//! [`BatchFailurePolicy::Skip`] is selected.

pub mod error;
pub mod orchestrator;
pub mod types;


pub use error::{PipelineError, PipelineResult};
pub use orchestrator::Pipeline;
pub use types::{
    BatchFailurePolicy, BatchReport, DigestRun, PipelineOptions, RunState, RunStats,
};
