//! Configuration error types.

use thiserror::Error;

use crate::constants::LimitsError;
use crate::paper::PaperError;

/// Errors raised while loading or validating configuration, before any pipeline work.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The interest statement is missing or blank.
    #[error("no interest statement provided (set DIGEST_INTEREST)")]
    NoInterestProvided,

    /// No scoring backend has usable credentials.
    #[error("no scoring provider available: {reason}")]
    NoProviderAvailable { reason: String },

    /// An environment variable was set to a value that could not be parsed.
    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    InvalidLimits(#[from] LimitsError),

    /// `DIGEST_TOPIC` does not name a known archive.
    #[error("invalid topic: {0}")]
    InvalidTopic(#[from] PaperError),
}
