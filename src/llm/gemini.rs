//! Google Gemini provider.
//!
//! Talks to the `generateContent` REST endpoint directly with reqwest. The
//! API key travels in the `x-goog-api-key` header so request URLs (which
//! show up in reqwest errors and logs) never carry the credential.

use super::{
    client::{LlmClient, build_http_client},
    types::{CompletionRequest, CompletionResponse, Usage},
};
use crate::{Error, Result, config::LlmConfig};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Gemini API base URL.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
];

pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = build_http_client(&config)?;
        let base_url = config
            .base_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(GEMINI_API_BASE)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
            model: config.model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request(request: &CompletionRequest) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::text(&request.prompt)],
            }],
            system_instruction: request.system_instruction.as_ref().map(|text| Content {
                role: None,
                parts: vec![Part::text(text)],
            }),
            generation_config: GenerationConfig {
                temperature: request.temperature,
                top_p: request.top_p,
                top_k: request.top_k,
                max_output_tokens: request.max_output_tokens,
                response_mime_type: "text/plain".to_string(),
            },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category: category.to_string(),
                    threshold: "BLOCK_NONE".to_string(),
                })
                .collect(),
        }
    }

    async fn error_from_response(response: reqwest::Response) -> Error {
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(status = %status, error = %e, "Failed to read Gemini error body");
                String::new()
            }
        };
        Error::upstream(format!("Gemini API error {}: {}", status, body))
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn create_completion(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = Self::build_request(&request);

        debug!(
            model = %self.model,
            prompt_len = request.prompt.len(),
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(self.generate_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::upstream(format!("Failed to parse Gemini response: {}", e)))?;

        let mut completion = api_response.into_completion()?;
        if completion.model.is_empty() {
            completion.model = self.model.clone();
        }
        Ok(completion)
    }

    async fn health_check(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        if response.status().is_success() {
            debug!("Gemini credential check succeeded");
            Ok(())
        } else {
            Err(Self::error_from_response(response).await)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    response_mime_type: String,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: String,
    threshold: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: Option<u32>,
    #[serde(default)]
    candidates_token_count: Option<u32>,
    #[serde(default)]
    total_token_count: Option<u32>,
}

impl GenerateContentResponse {
    fn into_completion(self) -> Result<CompletionResponse> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(Error::upstream(format!("Gemini blocked the prompt: {}", reason)));
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::upstream("Gemini returned no candidates"))?;

        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(Error::upstream("Gemini stopped the completion for safety reasons"));
        }
        if candidate.finish_reason.as_deref() == Some("MAX_TOKENS") {
            return Err(Error::upstream(
                "Gemini completion was cut off by the output token limit",
            ));
        }

        let text: String = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        let usage = self.usage_metadata.map(|u| {
            let prompt_tokens = u.prompt_token_count.unwrap_or(0);
            let completion_tokens = u.candidates_token_count.unwrap_or(0);
            Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: u
                    .total_token_count
                    .unwrap_or(prompt_tokens + completion_tokens),
            }
        });

        Ok(CompletionResponse {
            text,
            model: self.model_version.unwrap_or_default(),
            finish_reason: candidate.finish_reason,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_request_serialization() {
        let request = CompletionRequest {
            system_instruction: Some("You convert queries".to_string()),
            prompt: "fetch gce_instance".to_string(),
            temperature: Some(0.2),
            top_p: Some(0.9),
            top_k: Some(30),
            max_output_tokens: Some(8192),
        };

        let value = serde_json::to_value(GeminiClient::build_request(&request)).unwrap();

        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "fetch gce_instance");
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "You convert queries");
        assert!(value["systemInstruction"].get("role").is_none());
        assert_eq!(value["generationConfig"]["topK"], 30);
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 8192);
        assert_eq!(value["generationConfig"]["responseMimeType"], "text/plain");
        assert_eq!(value["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(value["safetySettings"][0]["threshold"], "BLOCK_NONE");
    }

    #[test]
    fn test_request_omits_unset_options() {
        let value =
            serde_json::to_value(GeminiClient::build_request(&CompletionRequest::new("q"))).unwrap();

        assert!(value.get("systemInstruction").is_none());
        assert!(value["generationConfig"].get("temperature").is_none());
        assert!(value["generationConfig"].get("topK").is_none());
    }

    #[test]
    fn test_completion_joins_text_parts() {
        let response = parse(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "sum by (zone) ("}, {"text": "up)"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 5, "totalTokenCount": 17},
            "modelVersion": "gemini-2.0-flash"
        }));

        let completion = response.into_completion().unwrap();
        assert_eq!(completion.text, "sum by (zone) (up)");
        assert_eq!(completion.model, "gemini-2.0-flash");
        assert_eq!(completion.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(completion.usage.unwrap().total_tokens, 17);
    }

    #[test]
    fn test_blocked_prompt_is_upstream_error() {
        let response = parse(json!({"promptFeedback": {"blockReason": "OTHER"}}));

        let err = response.into_completion().unwrap_err();
        assert!(err.is_upstream());
        assert!(err.to_string().contains("OTHER"));
    }

    #[test]
    fn test_safety_finish_is_upstream_error() {
        let response = parse(json!({
            "candidates": [{"content": {"parts": []}, "finishReason": "SAFETY"}]
        }));

        assert!(response.into_completion().unwrap_err().is_upstream());
    }

    #[test]
    fn test_max_tokens_finish_is_upstream_error() {
        let response = parse(json!({
            "candidates": [{
                "content": {"parts": [{"text": "sum by (zone) (rate(kubernetes_io:"}]},
                "finishReason": "MAX_TOKENS"
            }]
        }));

        let err = response.into_completion().unwrap_err();
        assert!(err.is_upstream());
        assert!(err.to_string().contains("output token limit"));
    }

    #[test]
    fn test_no_candidates_is_upstream_error() {
        let response = parse(json!({"candidates": []}));

        assert!(response.into_completion().unwrap_err().is_upstream());
    }

    #[test]
    fn test_missing_total_token_count_is_summed() {
        let response = parse(json!({
            "candidates": [{"content": {"parts": [{"text": "up"}]}}],
            "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 1}
        }));

        let usage = response.into_completion().unwrap().usage.unwrap();
        assert_eq!(usage.total_tokens, 4);
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let config = LlmConfig {
            base_url: Some("http://localhost:9000/v1beta/".to_string()),
            api_key: "k".to_string(),
            model: "gemini-test".to_string(),
            ..LlmConfig::default()
        };

        let client = GeminiClient::new(config).unwrap();
        assert_eq!(
            client.generate_url(),
            "http://localhost:9000/v1beta/models/gemini-test:generateContent"
        );
        assert!(!client.generate_url().contains("key="));
    }
}
