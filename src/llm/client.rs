use super::types::*;
use crate::{Error, Result, config::LlmConfig};
use async_openai::{Client, config::OpenAIConfig, types as openai_types};
use async_trait::async_trait;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::time::Duration;
use tracing::debug;

/// The model oracle: takes a prompt, returns a completion or fails.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn create_completion(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Cheap authenticated call used at startup to prove the credential works.
    async fn health_check(&self) -> Result<()>;
}

pub(crate) fn build_http_client(config: &LlmConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}

/// Gives up after the first failed attempt, so one upstream failure is one error.
fn no_retry_backoff() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let mut openai_config = OpenAIConfig::new().with_api_key(config.api_key.clone());

        if let Some(base_url) = config.base_url.as_deref().filter(|url| !url.is_empty()) {
            openai_config = openai_config.with_api_base(base_url.trim_end_matches('/'));
        }

        let client = Client::with_config(openai_config)
            .with_http_client(build_http_client(&config)?)
            .with_backoff(no_retry_backoff());

        Ok(Self {
            client,
            model: config.model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_messages(
        request: &CompletionRequest,
    ) -> Result<Vec<openai_types::ChatCompletionRequestMessage>> {
        let mut messages = Vec::with_capacity(2);

        if let Some(ref instruction) = request.system_instruction {
            let msg = openai_types::ChatCompletionRequestSystemMessageArgs::default()
                .content(openai_types::ChatCompletionRequestSystemMessageContent::Text(
                    instruction.clone(),
                ))
                .build()
                .map_err(|e| Error::upstream(format!("Failed to build system message: {}", e)))?;
            messages.push(msg.into());
        }

        let msg = openai_types::ChatCompletionRequestUserMessageArgs::default()
            .content(openai_types::ChatCompletionRequestUserMessageContent::Text(
                request.prompt.clone(),
            ))
            .build()
            .map_err(|e| Error::upstream(format!("Failed to build user message: {}", e)))?;
        messages.push(msg.into());

        Ok(messages)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn create_completion(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!(
            model = %self.model,
            prompt_len = request.prompt.len(),
            "Sending chat completion request"
        );

        let messages = Self::build_messages(&request)?;

        let mut request_builder = openai_types::CreateChatCompletionRequestArgs::default();
        request_builder.model(&self.model).messages(messages);

        if let Some(temperature) = request.temperature {
            request_builder.temperature(temperature);
        }
        if let Some(top_p) = request.top_p {
            request_builder.top_p(top_p);
        }
        if let Some(max_tokens) = request.max_output_tokens {
            request_builder.max_completion_tokens(max_tokens);
        }

        let openai_request = request_builder.build()?;
        let response = self.client.chat().create(openai_request).await?;

        debug!(
            "Received chat completion response with {} choices",
            response.choices.len()
        );

        into_completion(response)
    }

    async fn health_check(&self) -> Result<()> {
        let models = self.client.models().list().await?;
        debug!("OpenAI credential check listed {} models", models.data.len());
        Ok(())
    }
}

fn into_completion(
    response: openai_types::CreateChatCompletionResponse,
) -> Result<CompletionResponse> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::upstream("Chat completion returned no choices"))?;

    match choice.finish_reason {
        Some(openai_types::FinishReason::Length) => {
            return Err(Error::upstream(
                "Chat completion was cut off by the output token limit",
            ));
        }
        Some(openai_types::FinishReason::ContentFilter) => {
            return Err(Error::upstream(
                "Chat completion was stopped by the content filter",
            ));
        }
        _ => {}
    }

    let usage = response.usage.map(|u| Usage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(CompletionResponse {
        text: choice.message.content.unwrap_or_default(),
        model: response.model,
        finish_reason: choice.finish_reason.map(|fr| format!("{fr:?}")),
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LlmConfig, LlmProvider};
    use async_openai::types::ChatCompletionRequestMessage;
    use backoff::backoff::Backoff;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn create_test_config() -> LlmConfig {
        LlmConfig {
            provider: LlmProvider::OpenAi,
            base_url: Some("https://api.openai.com/v1/".to_string()),
            api_key: "test-api-key".to_string(),
            model: "gpt-4o".to_string(),
            ..LlmConfig::default()
        }
    }

    fn chat_response(finish_reason: &str) -> openai_types::CreateChatCompletionResponse {
        serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "sum(rate(up[5m"},
                "finish_reason": finish_reason,
                "logprobs": null
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_openai_client_creation() {
        let client = OpenAiClient::new(create_test_config()).unwrap();
        assert_eq!(client.model(), "gpt-4o");
    }

    #[test]
    fn test_openai_client_without_base_url() {
        let mut config = create_test_config();
        config.base_url = None;

        let client = OpenAiClient::new(config).unwrap();
        assert_eq!(client.model(), "gpt-4o");
    }

    #[test]
    fn test_build_messages_with_system_instruction() {
        let request = CompletionRequest::new("translate this").with_system_instruction("be exact");

        let messages = OpenAiClient::build_messages(&request).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_build_messages_without_system_instruction() {
        let request = CompletionRequest::new("translate this");

        let messages = OpenAiClient::build_messages(&request).unwrap();
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_stop_finish_returns_completion() {
        let completion = into_completion(chat_response("stop")).unwrap();

        assert_eq!(completion.text, "sum(rate(up[5m");
        assert_eq!(completion.model, "gpt-4o");
        assert!(completion.usage.is_none());
    }

    #[test]
    fn test_length_finish_is_upstream_error() {
        let err = into_completion(chat_response("length")).unwrap_err();
        assert!(err.is_upstream());
    }

    #[test]
    fn test_content_filter_finish_is_upstream_error() {
        let err = into_completion(chat_response("content_filter")).unwrap_err();
        assert!(err.is_upstream());
    }

    #[test]
    fn test_backoff_gives_up_after_first_attempt() {
        let mut backoff = no_retry_backoff();
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(backoff.next_backoff(), None);
    }
}
