//! OpenAI-compatible chat-completions backend over `reqwest`.
//!
//! Works with api.openai.com, Azure OpenAI deployments (`api-key` header +
//! `?api-version=`), and self-hosted servers exposing the same route
//! (vLLM, LiteLLM, Ollama's OpenAI shim).

use super::{InferenceBackend, InferenceRequest, InferenceResponse};
use crate::config::AuthScheme;
use crate::error::{InferenceError, InferenceErrorKind};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Connection settings for [`HttpBackend`].
#[derive(Clone)]
pub struct HttpBackendConfig {
    /// Full chat-completions URL.
    pub endpoint: String,
    pub api_key: String,
    pub auth_scheme: AuthScheme,
    pub api_version: Option<String>,
    /// Sent as `model`; Azure deployments encode the model in the URL instead.
    pub model: Option<String>,
}

impl fmt::Debug for HttpBackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBackendConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("auth_scheme", &self.auth_scheme)
            .field("api_version", &self.api_version)
            .field("model", &self.model)
            .finish()
    }
}

/// Chat-completions client. Cheap to clone; the underlying connection pool
/// is shared and safe for concurrent calls.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    config: HttpBackendConfig,
}

impl HttpBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| InferenceError::new(InferenceErrorKind::Other, e.to_string()))?;
        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        match &self.config.api_version {
            Some(v) => format!("{}?api-version={}", self.config.endpoint, v),
            None => self.config.endpoint.clone(),
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<MessageOut>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct MessageOut {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

fn build_body<'a>(model: Option<&'a str>, request: &'a InferenceRequest) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: &request.system,
            },
            ChatMessage {
                role: "user",
                content: &request.user,
            },
        ],
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        response_format: request.json_mode.then_some(ResponseFormat {
            kind: "json_object",
        }),
        seed: request.seed,
    }
}

/// Map a non-success HTTP status and body to an error kind.
fn classify_status(status: StatusCode, body: &str) -> InferenceErrorKind {
    match status.as_u16() {
        401 | 403 => InferenceErrorKind::AuthRejected,
        429 => {
            let b = body.to_lowercase();
            if b.contains("insufficient_quota") || b.contains("quota") {
                InferenceErrorKind::QuotaExhausted
            } else {
                InferenceErrorKind::RateLimited
            }
        }
        408 | 504 => InferenceErrorKind::Timeout,
        500 | 502 | 503 => InferenceErrorKind::Unavailable,
        _ => InferenceErrorKind::Other,
    }
}

fn classify_transport(e: &reqwest::Error) -> InferenceErrorKind {
    if e.is_timeout() {
        InferenceErrorKind::Timeout
    } else if e.is_connect() || e.is_request() {
        InferenceErrorKind::Unavailable
    } else {
        InferenceErrorKind::Other
    }
}

#[async_trait]
impl InferenceBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn complete(
        &self,
        request: &InferenceRequest,
    ) -> Result<InferenceResponse, InferenceError> {
        let body = build_body(self.config.model.as_deref(), request);

        let builder = self.client.post(self.url()).json(&body);
        let builder = match self.config.auth_scheme {
            AuthScheme::Bearer => {
                builder.header(AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            }
            AuthScheme::ApiKeyHeader => builder.header("api-key", &self.config.api_key),
        };

        let resp = builder
            .send()
            .await
            .map_err(|e| InferenceError::new(classify_transport(&e), e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let text = resp.text().await.unwrap_or_default();
            return Err(InferenceError::new(
                classify_status(status, &text),
                format!("HTTP {status}: {}", text.trim()),
            )
            .with_retry_after(retry_after));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| InferenceError::new(classify_transport(&e), e.to_string()))?;
        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            InferenceError::new(
                InferenceErrorKind::Other,
                format!("unexpected response body: {e}"),
            )
        })?;

        let choice = parsed.choices.into_iter().next();
        let truncated = choice
            .as_ref()
            .and_then(|c| c.finish_reason.as_deref())
            .is_some_and(|r| r == "length");
        let content = choice
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();
        let (prompt_tokens, completion_tokens) = parsed
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((0, 0));

        debug!(
            "HTTP backend: {} chars, {} in / {} out tokens, truncated={}",
            content.len(),
            prompt_tokens,
            completion_tokens,
            truncated
        );

        Ok(InferenceResponse {
            text: content,
            prompt_tokens,
            completion_tokens,
            truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json_mode: bool) -> InferenceRequest {
        InferenceRequest {
            system: "sys".into(),
            user: "usr".into(),
            temperature: 0.0,
            max_tokens: 100,
            json_mode,
            seed: Some(7),
        }
    }

    #[test]
    fn body_shape() {
        let req = request(true);
        let body = serde_json::to_value(build_body(Some("gpt-4o"), &req)).unwrap();
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "usr");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["seed"], 7);
    }

    #[test]
    fn body_omits_optional_fields() {
        let mut req = request(false);
        req.seed = None;
        let body = serde_json::to_value(build_body(None, &req)).unwrap();
        assert!(body.get("model").is_none());
        assert!(body.get("response_format").is_none());
        assert!(body.get("seed").is_none());
    }

    #[test]
    fn status_classification() {
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED, ""),
            InferenceErrorKind::AuthRejected
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            InferenceErrorKind::RateLimited
        );
        assert_eq!(
            classify_status(
                StatusCode::TOO_MANY_REQUESTS,
                r#"{"error":{"code":"insufficient_quota"}}"#
            ),
            InferenceErrorKind::QuotaExhausted
        );
        assert_eq!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, ""),
            InferenceErrorKind::Unavailable
        );
        assert_eq!(
            classify_status(StatusCode::GATEWAY_TIMEOUT, ""),
            InferenceErrorKind::Timeout
        );
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST, "bad"),
            InferenceErrorKind::Other
        );
    }

    #[test]
    fn azure_url_has_api_version() {
        let backend = HttpBackend::new(HttpBackendConfig {
            endpoint: "https://x.openai.azure.com/openai/deployments/gpt-4o/chat/completions".into(),
            api_key: "k".into(),
            auth_scheme: AuthScheme::ApiKeyHeader,
            api_version: Some("2025-01-01-preview".into()),
            model: None,
        })
        .unwrap();
        assert!(backend.url().ends_with("?api-version=2025-01-01-preview"));
    }

    #[test]
    fn config_debug_redacts_key() {
        let cfg = HttpBackendConfig {
            endpoint: "https://api.example.com".into(),
            api_key: "sk-secret".into(),
            auth_scheme: AuthScheme::Bearer,
            api_version: None,
            model: None,
        };
        assert!(!format!("{cfg:?}").contains("sk-secret"));
    }
}
