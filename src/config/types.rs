use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum LlmProvider {
    #[default]
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_true")]
    pub validate_on_startup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub logs: LogsConfig,
    #[serde(default = "default_favicon_path")]
    pub favicon_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Promote structural MQL warnings to request-rejecting errors.
    #[serde(default)]
    pub strict_validation: bool,
    /// Append deterministic metric-name mappings to the prompt.
    #[serde(default = "default_true")]
    pub metric_hints: bool,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }

    /// Conventional environment variable holding this provider's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::Gemini => "GOOGLE_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            other => Err(Error::config(format!(
                "Unknown LLM provider: '{}'. Valid providers: gemini, openai",
                other
            ))),
        }
    }
}

impl TryFrom<String> for LlmProvider {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.trim().is_empty() {
            return Err(Error::config(format!(
                "No API key configured: set LLM_API_KEY or {}",
                self.llm.provider.api_key_env()
            )));
        }
        if self.llm.model.trim().is_empty() {
            return Err(Error::config("llm.model must not be empty"));
        }
        if self.llm.timeout_secs == 0 {
            return Err(Error::config("llm.timeout_secs must be greater than zero"));
        }
        if self.server.port == 0 {
            return Err(Error::config("server.port must be greater than zero"));
        }
        Ok(())
    }
}

// Hand-written so the API key never ends up in a log line.
impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &"[redacted]")
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt.as_ref().map(|_| "[custom]"))
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("top_k", &self.top_k)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("validate_on_startup", &self.validate_on_startup)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            base_url: None,
            api_key: String::new(),
            model: default_model(),
            system_prompt: None,
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout_secs(),
            validate_on_startup: true,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            logs: LogsConfig::default(),
            favicon_path: default_favicon_path(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            strict_validation: false,
            metric_hints: true,
        }
    }
}

fn default_model() -> String {
    "gemini-2.0-pro-exp-02-05".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_top_p() -> f32 {
    0.9
}

fn default_top_k() -> u32 {
    30
}

fn default_max_output_tokens() -> u32 {
    8192
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_favicon_path() -> String {
    "favicon.ico".to_string()
}
