//! 配置层:构建器、YAML 文件与 `FLASHGEN_*` 环境变量覆盖。
//!
//! One [`GenerationConfig`] describes an upstream API key's worth of
//! behavior: the model and endpoint, retry and timeout policy, per-minute
//! rate ceilings, and the cache thresholds. Values come from code (builder
//! methods), a YAML file, or `FLASHGEN_*` environment overrides, and are
//! validated before a client is built.

use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::Path;
use url::Url;

use crate::cache::CacheConfig;
use crate::resilience::rate_limiter::RateLimitConfig;
use crate::{Error, Result};

fn default_model() -> String {
    "openai/gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_retries() -> u32 {
    3
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_similarity_threshold() -> f64 {
    0.85
}

fn default_cache_retention_days() -> i64 {
    30
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

/// Configuration for one upstream generation endpoint.
#[derive(Clone, Deserialize)]
pub struct GenerationConfig {
    /// Bearer token for the upstream API. May be left empty and resolved
    /// from the keyring or `{PROVIDER}_API_KEY` at client build time.
    #[serde(default)]
    pub api_key: String,

    /// Provider-qualified model name, `provider/model-id`.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Attempt budget per call, including the first attempt (1..=5).
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Per-attempt deadline in milliseconds (1000..=60000).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub rate_limiting: RateLimitConfig,

    /// Minimum similarity for a fallback cache match, in `[0, 1]`.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Age limit for candidates in the similarity scan.
    #[serde(default = "default_cache_retention_days")]
    pub cache_retention_days: i64,

    /// Base unit for retry delays: the wait after failed attempt `n` is
    /// `2^n * backoff_base_ms`, capped at `max_backoff_ms`.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
            retries: default_retries(),
            timeout_ms: default_timeout_ms(),
            rate_limiting: RateLimitConfig::default(),
            similarity_threshold: default_similarity_threshold(),
            cache_retention_days: default_cache_retention_days(),
            backoff_base_ms: default_backoff_base_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl GenerationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_rate_limiting(mut self, rate_limiting: RateLimitConfig) -> Self {
        self.rate_limiting = rate_limiting;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_cache_retention_days(mut self, days: i64) -> Self {
        self.cache_retention_days = days;
        self
    }

    pub fn with_backoff_base_ms(mut self, backoff_base_ms: u64) -> Self {
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    pub fn with_max_backoff_ms(mut self, max_backoff_ms: u64) -> Self {
        self.max_backoff_ms = max_backoff_ms;
        self
    }

    /// Defaults with `FLASHGEN_*` environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().env_overrides()
    }

    /// Apply `FLASHGEN_*` environment overrides on top of this config.
    /// Unparseable values are ignored in favor of the existing setting.
    pub fn env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("FLASHGEN_API_KEY") {
            if !v.is_empty() {
                self.api_key = v;
            }
        }
        if let Ok(v) = env::var("FLASHGEN_MODEL") {
            if !v.is_empty() {
                self.model = v;
            }
        }
        if let Ok(v) = env::var("FLASHGEN_BASE_URL") {
            if !v.is_empty() {
                self.base_url = v;
            }
        }
        if let Some(v) = env_parse("FLASHGEN_RETRIES") {
            self.retries = v;
        }
        if let Some(v) = env_parse("FLASHGEN_TIMEOUT_MS") {
            self.timeout_ms = v;
        }
        if let Some(v) = env_parse("FLASHGEN_MAX_REQUESTS_PER_MINUTE") {
            self.rate_limiting.max_requests_per_minute = v;
        }
        if let Some(v) = env_parse("FLASHGEN_MAX_TOKENS_PER_MINUTE") {
            self.rate_limiting.max_tokens_per_minute = v;
        }
        if let Some(v) = env_parse("FLASHGEN_SIMILARITY_THRESHOLD") {
            self.similarity_threshold = v;
        }
        if let Some(v) = env_parse("FLASHGEN_CACHE_RETENTION_DAYS") {
            self.cache_retention_days = v;
        }
        if let Some(v) = env_parse("FLASHGEN_BACKOFF_BASE_MS") {
            self.backoff_base_ms = v;
        }
        if let Some(v) = env_parse("FLASHGEN_MAX_BACKOFF_MS") {
            self.max_backoff_ms = v;
        }
        self
    }

    /// Parse a config from YAML text and validate it.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(raw).map_err(|e| Error::config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a YAML file and validate it.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml_str(&raw)
    }

    /// Reject out-of-range knobs before any request is dispatched.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::config("model must not be empty"));
        }
        Url::parse(&self.base_url)
            .map_err(|e| Error::config(format!("invalid base_url {:?}: {e}", self.base_url)))?;
        if !(1..=5).contains(&self.retries) {
            return Err(Error::config(format!(
                "retries must be between 1 and 5, got {}",
                self.retries
            )));
        }
        if !(1_000..=60_000).contains(&self.timeout_ms) {
            return Err(Error::config(format!(
                "timeout_ms must be between 1000 and 60000, got {}",
                self.timeout_ms
            )));
        }
        if self.rate_limiting.max_requests_per_minute == 0 {
            return Err(Error::config(
                "rate_limiting.max_requests_per_minute must be positive",
            ));
        }
        if self.rate_limiting.max_tokens_per_minute == 0 {
            return Err(Error::config(
                "rate_limiting.max_tokens_per_minute must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::config(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.cache_retention_days < 1 {
            return Err(Error::config(format!(
                "cache_retention_days must be positive, got {}",
                self.cache_retention_days
            )));
        }
        if self.backoff_base_ms == 0 {
            return Err(Error::config("backoff_base_ms must be positive"));
        }
        if self.max_backoff_ms < self.backoff_base_ms {
            return Err(Error::config(
                "max_backoff_ms must be at least backoff_base_ms",
            ));
        }
        Ok(())
    }

    /// Provider prefix of `model` (`"openai/gpt-4o-mini"` → `"openai"`).
    pub fn provider_id(&self) -> &str {
        match self.model.split_once('/') {
            Some((provider, _)) => provider,
            None => self.model.as_str(),
        }
    }

    /// The key from this config, else the keyring/environment chain for the
    /// model's provider.
    pub fn resolve_api_key(&self) -> Option<String> {
        if !self.api_key.is_empty() {
            return Some(self.api_key.clone());
        }
        crate::transport::resolve_api_key(self.provider_id())
    }

    /// Cache knobs derived from this config.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .with_similarity_threshold(self.similarity_threshold)
            .with_retention_days(self.cache_retention_days)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

// The api_key never appears in logs or debug dumps.
impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field(
                "api_key",
                &if self.api_key.is_empty() {
                    "<unset>"
                } else {
                    "<redacted>"
                },
            )
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("retries", &self.retries)
            .field("timeout_ms", &self.timeout_ms)
            .field("rate_limiting", &self.rate_limiting)
            .field("similarity_threshold", &self.similarity_threshold)
            .field("cache_retention_days", &self.cache_retention_days)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .field("max_backoff_ms", &self.max_backoff_ms)
            .finish()
    }
}
