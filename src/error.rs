use axum::http::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Message returned to callers when the model could not produce a translation.
/// Upstream details stay in the logs.
pub const UPSTREAM_FAILURE_MESSAGE: &str =
    "Failed to convert query: the language model request did not succeed";

const INTERNAL_FAILURE_MESSAGE: &str = "Internal server error";

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid query: {}", .errors.join("; "))]
    Validation {
        errors: Vec<String>,
        warnings: Vec<String>,
    },

    #[error("Upstream model error: {0}")]
    Upstream(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("OpenAI error: {0}")]
    OpenAi(#[from] async_openai::error::OpenAIError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Address parse error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn validation(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self::Validation { errors, warnings }
    }

    /// True for every failure that originates in the model oracle or the
    /// transport to it.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::Network(_) | Self::OpenAi(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            e if e.is_upstream() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-safe error messages. Only validation errors are passed through;
    /// everything else collapses to a fixed sentence so transport errors,
    /// URLs and credentials never reach the caller.
    pub fn public_messages(&self) -> Vec<String> {
        match self {
            Self::Validation { errors, .. } => errors.clone(),
            e if e.is_upstream() => vec![UPSTREAM_FAILURE_MESSAGE.to_string()],
            _ => vec![INTERNAL_FAILURE_MESSAGE.to_string()],
        }
    }

    pub fn warnings(&self) -> &[String] {
        match self {
            Self::Validation { warnings, .. } => warnings,
            _ => &[],
        }
    }
}
