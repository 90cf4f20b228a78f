use std::time::Duration;

use thiserror::Error;

use crate::completion::CompletionError;
use crate::constants::LimitsError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid scoring limits: {0}")]
    InvalidLimits(#[from] LimitsError),

    #[error("batch {batch} failed: {source}")]
    BatchFailed {
        batch: usize,
        #[source]
        source: CompletionError,
    },

    #[error("run exceeded its timeout of {limit:?}")]
    RunTimedOut { limit: Duration },
}

pub type PipelineResult<T> = Result<T, PipelineError>;
