use crate::defaults;
use crate::error::{BatchscribeError, Result};
use crate::stt::language::Language;
use crate::stt::transcriber::TranscriptionConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub transcription: TranscriptionSettings,
    pub batch: BatchConfig,
    pub output: OutputConfig,
}

/// Transcription service connection
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub model: String,
    /// Prefer `BATCHSCRIBE_API_KEY` over storing the key in the file.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// Options forwarded to every transcription call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranscriptionSettings {
    pub language: Language,
    pub smart_format: bool,
    pub punctuate: bool,
}

/// Batch sizing and concurrency
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub concurrency: usize,
    pub max_audio_mb: u64,
}

/// Where transcripts are written
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::DEEPGRAM_BASE_URL.to_string(),
            model: defaults::DEEPGRAM_MODEL.to_string(),
            api_key: None,
            timeout_secs: defaults::TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        let config = TranscriptionConfig::default();
        Self {
            language: config.language,
            smart_format: config.smart_format,
            punctuate: config.punctuate,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: defaults::BATCH_SIZE,
            concurrency: defaults::CONCURRENCY,
            max_audio_mb: defaults::MAX_AUDIO_MB,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(defaults::OUTPUT_DIR),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file is missing or contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BatchscribeError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                BatchscribeError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(BatchscribeError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - BATCHSCRIBE_API_KEY (fallback DEEPGRAM_API_KEY) → api.api_key
    /// - BATCHSCRIBE_BASE_URL → api.base_url
    /// - BATCHSCRIBE_MODEL → api.model
    /// - BATCHSCRIBE_LANGUAGE → transcription.language
    ///
    /// Empty values are ignored. An unsupported language code is an error.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(key) =
            non_empty_env("BATCHSCRIBE_API_KEY").or_else(|| non_empty_env("DEEPGRAM_API_KEY"))
        {
            self.api.api_key = Some(key);
        }

        if let Some(url) = non_empty_env("BATCHSCRIBE_BASE_URL") {
            self.api.base_url = url;
        }

        if let Some(model) = non_empty_env("BATCHSCRIBE_MODEL") {
            self.api.model = model;
        }

        if let Some(language) = non_empty_env("BATCHSCRIBE_LANGUAGE") {
            self.transcription.language = language.parse()?;
        }

        Ok(self)
    }

    /// Check values that deserialization alone cannot enforce.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("batch.batch_size", self.batch.batch_size as u64),
            ("batch.concurrency", self.batch.concurrency as u64),
            ("batch.max_audio_mb", self.batch.max_audio_mb),
            ("api.timeout_secs", self.api.timeout_secs),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(BatchscribeError::ConfigInvalidValue {
                    key: key.to_string(),
                    message: "must be at least 1".to_string(),
                });
            }
        }
        if self.batch.max_audio_mb > defaults::MAX_AUDIO_MB_LIMIT {
            return Err(BatchscribeError::ConfigInvalidValue {
                key: "batch.max_audio_mb".to_string(),
                message: format!("must be at most {}", defaults::MAX_AUDIO_MB_LIMIT),
            });
        }
        if self.api.base_url.trim().is_empty() {
            return Err(BatchscribeError::ConfigInvalidValue {
                key: "api.base_url".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// The configured API key, or `MissingApiKey`.
    pub fn api_key(&self) -> Result<&str> {
        self.api
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(BatchscribeError::MissingApiKey)
    }

    pub fn transcription_config(&self) -> TranscriptionConfig {
        TranscriptionConfig {
            language: self.transcription.language,
            smart_format: self.transcription.smart_format,
            punctuate: self.transcription.punctuate,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn max_audio_bytes(&self) -> u64 {
        defaults::mb_to_bytes(self.batch.max_audio_mb)
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/batchscribe/config.toml on Linux, or `None` when no
    /// config directory can be determined.
    #[cfg(feature = "cli")]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("batchscribe").join("config.toml"))
    }

    /// Render as TOML with the API key redacted.
    pub fn to_redacted_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if shown.api.api_key.is_some() {
            shown.api.api_key = Some("<redacted>".to_string());
        }
        toml::to_string_pretty(&shown).map_err(|e| BatchscribeError::Other(e.to_string()))
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}
