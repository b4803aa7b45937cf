use async_trait::async_trait;
use mql2promql::{
    Error, Result,
    llm::{CompletionRequest, CompletionResponse, LlmClient},
};
use std::sync::{Arc, Mutex};

/// Mock model oracle that records every request it receives.
#[derive(Debug, Clone)]
pub struct MockLlmClient {
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
    pub completion: Option<String>,
    pub error: Option<String>,
}

impl MockLlmClient {
    /// Answers every request with the same completion.
    pub fn with_completion(text: impl Into<String>) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            completion: Some(text.into()),
            error: None,
        }
    }

    /// Echoes the prompt back as the completion.
    pub fn echo() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            completion: None,
            error: None,
        }
    }

    /// Fails every request with an upstream error.
    pub fn failing(error: impl Into<String>) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            completion: None,
            error: Some(error.into()),
        }
    }

    pub fn get_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn create_completion(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(ref error) = self.error {
            return Err(Error::upstream(error.clone()));
        }

        Ok(CompletionResponse {
            text: self
                .completion
                .clone()
                .unwrap_or_else(|| request.prompt.clone()),
            model: "mock-model".to_string(),
            finish_reason: Some("STOP".to_string()),
            usage: None,
        })
    }

    async fn health_check(&self) -> Result<()> {
        match self.error {
            Some(ref error) => Err(Error::upstream(error.clone())),
            None => Ok(()),
        }
    }
}
