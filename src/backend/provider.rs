//! Adapter from an edgequake-llm provider to [`InferenceBackend`].

use super::{classify_message, InferenceBackend, InferenceRequest, InferenceResponse};
use crate::error::InferenceError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, LLMResponse};
use std::fmt;
use std::sync::Arc;

/// Any [`LLMProvider`] as an inference backend.
///
/// edgequake-llm surfaces failures as text, so error kinds are recovered
/// from the message via [`classify_message`].
#[derive(Clone)]
pub struct ProviderBackend {
    name: String,
    provider: Arc<dyn LLMProvider>,
}

impl ProviderBackend {
    pub fn new(name: impl Into<String>, provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            name: name.into(),
            provider,
        }
    }
}

impl fmt::Debug for ProviderBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderBackend")
            .field("name", &self.name)
            .finish()
    }
}

/// Response format edgequake-llm forwards for JSON mode.
const JSON_RESPONSE_FORMAT: &str = "json_object";

fn build_options(request: &InferenceRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(request.temperature),
        max_tokens: Some(request.max_tokens),
        response_format: request
            .json_mode
            .then(|| JSON_RESPONSE_FORMAT.to_string()),
        ..Default::default()
    }
}

/// `length` from OpenAI-style providers, `max_tokens` from Anthropic.
fn hit_token_limit(finish_reason: Option<&str>) -> bool {
    matches!(finish_reason, Some("length") | Some("max_tokens"))
}

fn to_response(response: LLMResponse) -> InferenceResponse {
    InferenceResponse {
        truncated: hit_token_limit(response.finish_reason.as_deref()),
        text: response.content,
        prompt_tokens: response.prompt_tokens,
        completion_tokens: response.completion_tokens,
    }
}

#[async_trait]
impl InferenceBackend for ProviderBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: &InferenceRequest,
    ) -> Result<InferenceResponse, InferenceError> {
        let messages = vec![
            ChatMessage::system(&request.system),
            ChatMessage::user(&request.user),
        ];
        let options = build_options(request);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| {
                let detail = e.to_string();
                InferenceError::new(classify_message(&detail), detail)
            })?;

        Ok(to_response(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgequake_llm::MockProvider;

    fn request(json_mode: bool) -> InferenceRequest {
        InferenceRequest {
            system: "sys".into(),
            user: "statement".into(),
            temperature: 0.0,
            max_tokens: 8000,
            json_mode,
            seed: None,
        }
    }

    #[test]
    fn options_follow_request() {
        let opts = build_options(&request(true));
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(8000));
        assert_eq!(opts.response_format.as_deref(), Some("json_object"));

        let opts = build_options(&request(false));
        assert_eq!(opts.response_format, None);
    }

    #[test]
    fn finish_reason_marks_truncation() {
        let cut = LLMResponse::new("[{\"date\"", "gpt-4.1-nano")
            .with_usage(900, 8000)
            .with_finish_reason("length");
        let resp = to_response(cut);
        assert!(resp.truncated);
        assert_eq!(resp.prompt_tokens, 900);
        assert_eq!(resp.completion_tokens, 8000);

        let anthropic = LLMResponse::new("[", "claude").with_finish_reason("max_tokens");
        assert!(to_response(anthropic).truncated);

        let done = LLMResponse::new("[]", "gpt-4.1-nano").with_finish_reason("stop");
        assert!(!to_response(done).truncated);
        assert!(!to_response(LLMResponse::new("[]", "gpt-4.1-nano")).truncated);
    }

    #[tokio::test]
    async fn chat_reply_becomes_response_text() {
        let provider = MockProvider::new();
        provider.add_response("[]").await;
        let backend = ProviderBackend::new("mock", Arc::new(provider));
        let resp = backend.complete(&request(true)).await.unwrap();
        assert_eq!(resp.text, "[]");
        assert_eq!(backend.name(), "mock");
    }
}
