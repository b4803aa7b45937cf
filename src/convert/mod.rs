pub mod metrics;
pub mod prompt;
pub mod validator;

pub use validator::{MqlValidator, ValidationReport};

use crate::{
    Error, Result,
    config::{ConversionConfig, LlmConfig},
    llm::{CompletionRequest, LlmClient},
};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, info, trace, warn};

/// A successful translation.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    /// The model's completion, exactly as returned.
    pub promql_query: String,
    pub warnings: Vec<String>,
    pub model: String,
    pub elapsed: Duration,
}

/// Sampling parameters and prompt settings applied to every request.
#[derive(Debug, Clone)]
pub struct ConverterSettings {
    pub model: String,
    pub system_instruction: String,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub max_output_tokens: Option<u32>,
    pub metric_hints: bool,
    pub strict_validation: bool,
}

impl ConverterSettings {
    pub fn from_config(llm: &LlmConfig, conversion: &ConversionConfig) -> Self {
        Self {
            model: llm.model.clone(),
            system_instruction: llm
                .system_prompt
                .clone()
                .unwrap_or_else(|| prompt::SYSTEM_INSTRUCTION.to_string()),
            temperature: Some(llm.temperature),
            top_p: Some(llm.top_p),
            top_k: Some(llm.top_k),
            max_output_tokens: Some(llm.max_output_tokens),
            metric_hints: conversion.metric_hints,
            strict_validation: conversion.strict_validation,
        }
    }
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self::from_config(&LlmConfig::default(), &ConversionConfig::default())
    }
}

/// Turns MQL into PromQL by way of the model oracle. Holds no per-request
/// state, so one instance is shared by all requests.
pub struct Converter {
    client: Arc<dyn LlmClient>,
    validator: MqlValidator,
    settings: ConverterSettings,
}

impl Converter {
    pub fn new(client: Arc<dyn LlmClient>, settings: ConverterSettings) -> Self {
        Self {
            client,
            validator: MqlValidator::new(settings.strict_validation),
            settings,
        }
    }

    pub fn settings(&self) -> &ConverterSettings {
        &self.settings
    }

    /// Validates the query, asks the model once and returns its answer.
    ///
    /// The oracle is never called for a query that fails validation. A blank
    /// completion is reported as an upstream failure.
    pub async fn convert(&self, mql_query: &str) -> Result<Conversion> {
        let report = self.validator.validate(mql_query);
        if !report.is_valid() {
            warn!("Validation failed: {:?}", report.errors);
            return Err(Error::validation(report.errors, report.warnings));
        }
        for warning in &report.warnings {
            debug!("Validation warning: {}", warning);
        }

        let request = self.build_request(mql_query);
        trace!("Prompt: {}", request.prompt);

        let started = Instant::now();
        let response = self.client.create_completion(request).await?;
        let elapsed = started.elapsed();

        if response.text.trim().is_empty() {
            return Err(Error::upstream(format!(
                "Model returned an empty completion (finish reason: {})",
                response.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        info!(
            elapsed_ms = elapsed.as_millis() as u64,
            completion_len = response.text.len(),
            "Conversion completed"
        );

        let model = if response.model.is_empty() {
            self.settings.model.clone()
        } else {
            response.model
        };

        Ok(Conversion {
            promql_query: response.text,
            warnings: report.warnings,
            model,
            elapsed,
        })
    }

    pub fn build_request(&self, mql_query: &str) -> CompletionRequest {
        let hints = if self.settings.metric_hints {
            metrics::metric_hints(mql_query)
        } else {
            Vec::new()
        };

        CompletionRequest {
            system_instruction: Some(self.settings.system_instruction.clone()),
            prompt: prompt::build_prompt(mql_query, &hints),
            temperature: self.settings.temperature,
            top_p: self.settings.top_p,
            top_k: self.settings.top_k,
            max_output_tokens: self.settings.max_output_tokens,
        }
    }
}
