use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::mpsc;

use super::models::*;
use crate::models::Role;
use crate::providers::traits::CompletionProvider;
use crate::providers::types::{ChatMessage, ChatRequest, CompletionError, StreamEvent};

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

pub struct GroqProvider {
    client: Client,
}

impl GroqProvider {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    fn base_url(custom: Option<&str>) -> &str {
        custom.unwrap_or(DEFAULT_BASE_URL)
    }

    fn translate_role(role: &Role) -> &'static str {
        match role {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Build the wire message list: system prompt first, then the assembled
    /// history and final user turn in order.
    fn build_messages(system_prompt: Option<&str>, messages: &[ChatMessage]) -> Vec<GroqMessage> {
        let mut result = Vec::new();

        if let Some(prompt) = system_prompt {
            if !prompt.is_empty() {
                result.push(GroqMessage {
                    role: "system".to_string(),
                    content: prompt.to_string(),
                });
            }
        }

        for msg in messages {
            result.push(GroqMessage {
                role: Self::translate_role(&msg.role).to_string(),
                content: msg.content.clone(),
            });
        }

        result
    }

    fn parse_error_message(status: reqwest::StatusCode, body: &str) -> String {
        if let Ok(parsed) = serde_json::from_str::<GroqErrorResponse>(body) {
            return format!("HTTP {}: {}", status.as_u16(), parsed.error.message);
        }
        format!("HTTP {}: Request failed", status.as_u16())
    }
}

impl Default for GroqProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for GroqProvider {
    async fn stream_chat(
        &self,
        request: ChatRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), CompletionError> {
        use super::stream::parse_sse_stream;

        let base = Self::base_url(request.base_url.as_deref());
        let url = format!("{}/chat/completions", base.trim_end_matches('/'));

        let messages = Self::build_messages(request.system_prompt.as_deref(), &request.messages);

        // Parameters the wire format does not know (repetition penalty) are
        // already absent from ChatRequest and never serialized.
        let groq_request = GroqRequest {
            model: request.model.clone(),
            messages,
            stream: true,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            top_p: request.top_p,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", request.api_key))
            .header("content-type", "application/json")
            .json(&groq_request)
            .send()
            .await
            .map_err(|e| CompletionError::NetworkError(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(CompletionError::AuthError("Invalid API key".to_string()));
        }

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CompletionError::RateLimited {
                retry_after_secs: None,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::RequestFailed(Self::parse_error_message(
                status, &body,
            )));
        }

        parse_sse_stream(response.bytes_stream(), tx).await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_leads_the_wire_messages() {
        let messages = vec![
            ChatMessage {
                role: Role::User,
                content: "hi".to_string(),
            },
            ChatMessage {
                role: Role::Assistant,
                content: "hello".to_string(),
            },
        ];
        let wire = GroqProvider::build_messages(Some("persona"), &messages);
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[0].content, "persona");
        assert_eq!(wire[1].role, "user");
        assert_eq!(wire[2].role, "assistant");
    }

    #[test]
    fn empty_system_prompt_is_omitted() {
        let wire = GroqProvider::build_messages(Some(""), &[]);
        assert!(wire.is_empty());
    }

    #[test]
    fn unsupported_params_never_reach_the_wire() {
        let request = GroqRequest {
            model: "llama3-8b-8192".to_string(),
            messages: vec![GroqMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
            stream: true,
            temperature: Some(0.7),
            max_tokens: Some(256),
            top_p: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("repetition_penalty"));
        assert!(!json.contains("top_p"));
        assert!(json.contains("\"stream\":true"));
    }
}
