//! Environment-backed configuration.
//!
//! Everything except the interest statement has a default. Override with `DIGEST_*`
//! environment variables; provider credentials use the providers' own variable names.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::completion::{
    BackendStyle, CompletionBackend, CompletionClient, DEFAULT_API_BASE, DecodingConfig,
    GenaiChatBackend, OpenAiChatBackend, OpenAiCompletionBackend, ProviderCredentials,
    RetryPolicy,
};
use crate::constants::{
    DEFAULT_BACKOFF_SECS, DEFAULT_PRE_CALL_DELAY_SECS, DEFAULT_PROMPTS_PER_REQUEST,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETRY_BUDGET, ScoringLimits,
};
use crate::paper::{InterestQuery, resolve_topic};
use crate::pipeline::{BatchFailurePolicy, PipelineOptions};

/// Scoring backend selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// OpenAI-compatible `/chat/completions`.
    OpenAiChat,
    /// OpenAI-compatible `/completions` with prompt arrays.
    OpenAiCompletion,
    /// Any provider `genai` resolves from the model name.
    Genai,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai-chat" | "openai_chat" | "chat" => Ok(Self::OpenAiChat),
            "openai-completion" | "openai_completion" | "completion" => Ok(Self::OpenAiCompletion),
            "genai" => Ok(Self::Genai),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProviderKind::OpenAiChat => "openai-chat",
            ProviderKind::OpenAiCompletion => "openai-completion",
            ProviderKind::Genai => "genai",
        };
        f.write_str(s)
    }
}

/// Run configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read overrides on top of defaults, then [`Config::validate`]
/// before building the pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Free-text interest statement. Required.
    pub interest: Option<String>,

    /// Papers per prompt and minimum relevancy score. Default: `2` / `2`.
    pub limits: ScoringLimits,

    /// Explicit backend; inferred from credentials and model name when unset.
    pub provider: Option<ProviderKind>,

    /// OpenAI-compatible endpoint and key, present when `OPENAI_API_KEY` is set.
    pub openai: Option<ProviderCredentials>,

    /// `true` when a key for a `genai`-routed provider is present.
    pub genai_available: bool,

    pub decoding: DecodingConfig,

    pub retry: RetryPolicy,

    /// Prompts per request for completion-style backends. Default: `8`.
    pub prompts_per_request: usize,

    /// Batches in flight at once. Default: `1`.
    pub concurrency: usize,

    pub on_batch_failure: BatchFailurePolicy,

    /// Whole-run timeout. Default: none.
    pub run_timeout: Option<Duration>,

    /// Topic display name, e.g. `"Computer Science"`.
    pub topic: Option<String>,

    /// Subject categories to keep; empty keeps every paper.
    pub categories: Vec<String>,

    /// JSON array of papers from the fetch step. Default: `papers.json`.
    pub papers_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interest: None,
            limits: ScoringLimits::default(),
            provider: None,
            openai: None,
            genai_available: false,
            decoding: DecodingConfig::default(),
            retry: RetryPolicy::default(),
            prompts_per_request: DEFAULT_PROMPTS_PER_REQUEST,
            concurrency: 1,
            on_batch_failure: BatchFailurePolicy::Abort,
            run_timeout: None,
            topic: None,
            categories: Vec::new(),
            papers_path: PathBuf::from("papers.json"),
        }
    }
}

impl Config {
    const ENV_INTEREST: &'static str = "DIGEST_INTEREST";
    const ENV_THRESHOLD: &'static str = "DIGEST_THRESHOLD";
    const ENV_BATCH_SIZE: &'static str = "DIGEST_BATCH_SIZE";
    const ENV_PROVIDER: &'static str = "DIGEST_PROVIDER";
    const ENV_MODEL: &'static str = "DIGEST_MODEL";
    const ENV_API_BASE: &'static str = "DIGEST_API_BASE";
    const ENV_OPENAI_KEY: &'static str = "OPENAI_API_KEY";
    const ENV_OPENAI_ORG: &'static str = "OPENAI_ORG";
    const ENV_GENAI_KEYS: &'static [&'static str] = &["GEMINI_API_KEY", "ANTHROPIC_API_KEY"];
    const ENV_MAX_TOKENS: &'static str = "DIGEST_MAX_TOKENS";
    const ENV_TEMPERATURE: &'static str = "DIGEST_TEMPERATURE";
    const ENV_TOP_P: &'static str = "DIGEST_TOP_P";
    const ENV_NUM_COMPLETIONS: &'static str = "DIGEST_NUM_COMPLETIONS";
    const ENV_STOP: &'static str = "DIGEST_STOP";
    const ENV_PRESENCE_PENALTY: &'static str = "DIGEST_PRESENCE_PENALTY";
    const ENV_FREQUENCY_PENALTY: &'static str = "DIGEST_FREQUENCY_PENALTY";
    const ENV_RETRY_BUDGET: &'static str = "DIGEST_RETRY_BUDGET";
    const ENV_BACKOFF_SECS: &'static str = "DIGEST_BACKOFF_SECS";
    const ENV_PRE_CALL_DELAY_SECS: &'static str = "DIGEST_PRE_CALL_DELAY_SECS";
    const ENV_REQUEST_TIMEOUT_SECS: &'static str = "DIGEST_REQUEST_TIMEOUT_SECS";
    const ENV_RUN_TIMEOUT_SECS: &'static str = "DIGEST_RUN_TIMEOUT_SECS";
    const ENV_PROMPTS_PER_REQUEST: &'static str = "DIGEST_PROMPTS_PER_REQUEST";
    const ENV_CONCURRENCY: &'static str = "DIGEST_CONCURRENCY";
    const ENV_ON_BATCH_FAILURE: &'static str = "DIGEST_ON_BATCH_FAILURE";
    const ENV_TOPIC: &'static str = "DIGEST_TOPIC";
    const ENV_CATEGORIES: &'static str = "DIGEST_CATEGORIES";
    const ENV_PAPERS_PATH: &'static str = "DIGEST_PAPERS_PATH";

    /// Loads configuration from environment variables (falling back to defaults).
    ///
    /// Fails only on values that are set but unparseable; missing required values are
    /// reported by [`Config::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let limits = ScoringLimits::new(
            Self::parse_from_env(Self::ENV_BATCH_SIZE, defaults.limits.batch_size)?,
            Self::parse_from_env(Self::ENV_THRESHOLD, defaults.limits.threshold)?,
        );

        let provider = match Self::optional_string_from_env(Self::ENV_PROVIDER) {
            Some(value) => Some(value.parse::<ProviderKind>().map_err(|reason| {
                ConfigError::InvalidValue {
                    name: Self::ENV_PROVIDER,
                    value,
                    reason,
                }
            })?),
            None => None,
        };

        let api_base = Self::optional_string_from_env(Self::ENV_API_BASE)
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let openai = Self::optional_string_from_env(Self::ENV_OPENAI_KEY).map(|key| {
            let credentials = ProviderCredentials::new(key, api_base.clone());
            match Self::optional_string_from_env(Self::ENV_OPENAI_ORG) {
                Some(org) => credentials.with_organization(org),
                None => credentials,
            }
        });
        let genai_available = Self::ENV_GENAI_KEYS
            .iter()
            .any(|name| Self::optional_string_from_env(name).is_some());

        let decoding = DecodingConfig {
            model_name: Self::optional_string_from_env(Self::ENV_MODEL)
                .unwrap_or(defaults.decoding.model_name),
            max_output_tokens: Self::parse_from_env(
                Self::ENV_MAX_TOKENS,
                defaults.decoding.max_output_tokens,
            )?,
            temperature: Self::parse_from_env(Self::ENV_TEMPERATURE, defaults.decoding.temperature)?,
            top_p: Self::parse_from_env(Self::ENV_TOP_P, defaults.decoding.top_p)?,
            num_completions: Self::parse_from_env(
                Self::ENV_NUM_COMPLETIONS,
                defaults.decoding.num_completions,
            )?,
            stop_sequences: Self::optional_string_from_env(Self::ENV_STOP)
                .map(|v| parse_stop_sequences(&v))
                .unwrap_or_default(),
            presence_penalty: Self::parse_from_env(
                Self::ENV_PRESENCE_PENALTY,
                defaults.decoding.presence_penalty,
            )?,
            frequency_penalty: Self::parse_from_env(
                Self::ENV_FREQUENCY_PENALTY,
                defaults.decoding.frequency_penalty,
            )?,
        };

        let request_timeout_secs =
            Self::parse_from_env(Self::ENV_REQUEST_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS)?;
        let retry = RetryPolicy {
            retry_budget: Self::parse_from_env(Self::ENV_RETRY_BUDGET, DEFAULT_RETRY_BUDGET)?,
            backoff: Duration::from_secs(Self::parse_from_env(
                Self::ENV_BACKOFF_SECS,
                DEFAULT_BACKOFF_SECS,
            )?),
            pre_call_delay: Duration::from_secs(Self::parse_from_env(
                Self::ENV_PRE_CALL_DELAY_SECS,
                DEFAULT_PRE_CALL_DELAY_SECS,
            )?),
            request_timeout: (request_timeout_secs > 0)
                .then(|| Duration::from_secs(request_timeout_secs)),
            shrink_factor: defaults.retry.shrink_factor,
        };

        let run_timeout = match Self::optional_string_from_env(Self::ENV_RUN_TIMEOUT_SECS) {
            Some(_) => {
                let secs: u64 = Self::parse_from_env(Self::ENV_RUN_TIMEOUT_SECS, 0)?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            interest: Self::optional_string_from_env(Self::ENV_INTEREST),
            limits,
            provider,
            openai,
            genai_available,
            decoding,
            retry,
            prompts_per_request: Self::parse_from_env(
                Self::ENV_PROMPTS_PER_REQUEST,
                defaults.prompts_per_request,
            )?,
            concurrency: Self::parse_from_env(Self::ENV_CONCURRENCY, defaults.concurrency)?,
            on_batch_failure: Self::parse_from_env(
                Self::ENV_ON_BATCH_FAILURE,
                defaults.on_batch_failure,
            )?,
            run_timeout,
            topic: Self::optional_string_from_env(Self::ENV_TOPIC),
            categories: Self::optional_string_from_env(Self::ENV_CATEGORIES)
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
            papers_path: Self::optional_string_from_env(Self::ENV_PAPERS_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.papers_path),
        })
    }

    /// Checks everything the pipeline needs before it starts:
    /// - an interest statement is present
    /// - batch size and threshold are usable
    /// - a provider with credentials can be selected
    /// - the topic, if set, resolves to an archive
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.interest_query()?;
        self.limits.validate()?;

        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_CONCURRENCY,
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.decoding.max_output_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_MAX_TOKENS,
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        self.resolved_provider()?;

        if let Some(topic) = &self.topic {
            resolve_topic(topic)?;
        }

        Ok(())
    }

    pub fn interest_query(&self) -> Result<InterestQuery, ConfigError> {
        self.interest
            .as_deref()
            .and_then(InterestQuery::parse)
            .ok_or(ConfigError::NoInterestProvided)
    }

    /// The explicit provider if its credentials are present; otherwise OpenAI (shape inferred
    /// from the model name) when keyed, then `genai`.
    pub fn resolved_provider(&self) -> Result<ProviderKind, ConfigError> {
        match self.provider {
            Some(kind @ (ProviderKind::OpenAiChat | ProviderKind::OpenAiCompletion)) => {
                if self.openai.is_none() {
                    return Err(ConfigError::NoProviderAvailable {
                        reason: format!("{} requires {}", kind, Self::ENV_OPENAI_KEY),
                    });
                }
                Ok(kind)
            }
            Some(ProviderKind::Genai) => {
                if !self.genai_available {
                    return Err(ConfigError::NoProviderAvailable {
                        reason: format!("genai requires one of {}", Self::ENV_GENAI_KEYS.join(", ")),
                    });
                }
                Ok(ProviderKind::Genai)
            }
            None if self.openai.is_some() => Ok(match BackendStyle::infer(&self.decoding.model_name) {
                BackendStyle::Chat => ProviderKind::OpenAiChat,
                BackendStyle::Completion => ProviderKind::OpenAiCompletion,
            }),
            None if self.genai_available => Ok(ProviderKind::Genai),
            None => Err(ConfigError::NoProviderAvailable {
                reason: format!(
                    "set {} or one of {}",
                    Self::ENV_OPENAI_KEY,
                    Self::ENV_GENAI_KEYS.join(", ")
                ),
            }),
        }
    }

    /// Constructs the backend for [`Config::resolved_provider`], threading credentials in
    /// explicitly.
    pub fn build_backend(&self) -> Result<Arc<dyn CompletionBackend>, ConfigError> {
        let kind = self.resolved_provider()?;
        let backend: Arc<dyn CompletionBackend> = match (kind, &self.openai) {
            (ProviderKind::OpenAiChat, Some(credentials)) => {
                Arc::new(OpenAiChatBackend::new(credentials.clone()))
            }
            (ProviderKind::OpenAiCompletion, Some(credentials)) => {
                Arc::new(OpenAiCompletionBackend::new(credentials.clone()))
            }
            (ProviderKind::Genai, _) => Arc::new(GenaiChatBackend::default()),
            (kind, None) => {
                return Err(ConfigError::NoProviderAvailable {
                    reason: format!("{} requires {}", kind, Self::ENV_OPENAI_KEY),
                });
            }
        };
        Ok(backend)
    }

    pub fn completion_client(&self) -> Result<CompletionClient, ConfigError> {
        Ok(CompletionClient::new(
            self.build_backend()?,
            self.decoding.clone(),
            self.retry.clone(),
        )
        .with_prompts_per_request(self.prompts_per_request))
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        let options = PipelineOptions::default()
            .with_limits(self.limits)
            .with_concurrency(self.concurrency)
            .with_failure_policy(self.on_batch_failure);
        match self.run_timeout {
            Some(limit) => options.with_run_timeout(limit),
            None => options,
        }
    }

    fn optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_from_env<T>(var_name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match Self::optional_string_from_env(var_name) {
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                name: var_name,
                reason: e.to_string(),
                value,
            }),
            None => Ok(default),
        }
    }
}

/// Splits a comma-separated list, trimming entries and dropping empty ones.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Comma-separated stop sequences; `\n` escapes become newlines.
fn parse_stop_sequences(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.replace("\\n", "\n"))
        .filter(|s| !s.is_empty())
        .collect()
}
