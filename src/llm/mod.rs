mod client;
mod gemini;
mod types;

pub use client::*;
pub use gemini::*;
pub use types::*;

use crate::{
    Result,
    config::{LlmConfig, LlmProvider},
};
use std::sync::Arc;
use tracing::info;

/// Builds the oracle client for the configured provider.
pub fn create_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    info!(
        provider = %config.provider,
        model = %config.model,
        "Creating LLM client"
    );

    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::Gemini => Arc::new(GeminiClient::new(config.clone())?),
        LlmProvider::OpenAi => Arc::new(OpenAiClient::new(config.clone())?),
    };
    Ok(client)
}
