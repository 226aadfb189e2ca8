use rag_core::domain::{ConversationHistory, ConversationMessage};
use rag_core::error::AppError;
use rag_core::validate::validate_history;
use serde::{Deserialize, Serialize};

use super::Llm;
use crate::backend::{BackendCall, BackendClient};

pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiChatLlm {
    client: BackendClient,
    model: String,
    api_key: String,
}

impl OpenAiChatLlm {
    pub fn new(client: BackendClient, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: &'a [ConversationMessage],
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl Llm for OpenAiChatLlm {
    fn generate(&self, history: &ConversationHistory, temperature: f32) -> Result<String, AppError> {
        validate_history(history)?;

        let call = BackendCall::Generation;
        let url = self.client.endpoint(CHAT_COMPLETIONS_PATH);
        let req = ChatRequest {
            model: &self.model,
            temperature,
            messages: history.messages(),
            stream: false,
        };
        tracing::debug!(%url, model = %self.model, messages = history.len(), temperature, "chat completion");

        let resp = ureq::post(&url)
            .timeout(self.client.timeout())
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(call.encode(&req)?);
        let body = call.read_body(&url, resp)?;
        parse_chat_response(&body)
    }
}

fn parse_chat_response(body: &str) -> Result<String, AppError> {
    let call = BackendCall::Generation;
    let v: ChatResponse = call.decode(body)?;
    let content = v
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| call.invalid("Chat completion response had no message content"))?;
    if content.trim().is_empty() {
        return Err(call.invalid("Chat completion response was empty"));
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::{parse_chat_response, OpenAiChatLlm};
    use crate::backend::BackendClient;

    #[test]
    fn reports_configured_model() {
        let client = BackendClient::new("http://127.0.0.1:11435/v1").unwrap();
        let llm = OpenAiChatLlm::new(client, "gemini-2.5-pro", "local-token");
        assert_eq!(llm.model(), "gemini-2.5-pro");
    }

    #[test]
    fn takes_first_choice_content() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"12"}},{"message":{"content":"other"}}]}"#;
        assert_eq!(parse_chat_response(body).unwrap(), "12");
    }

    #[test]
    fn rejects_responses_without_usable_text() {
        for body in [
            r#"{"choices":[]}"#,
            r#"{}"#,
            r#"{"choices":[{"message":{"content":null}}]}"#,
            r#"{"choices":[{"message":{"content":"  "}}]}"#,
        ] {
            let err = parse_chat_response(body).unwrap_err();
            assert_eq!(err.code, "GENERATION_INVALID_RESPONSE", "body={body}");
        }
    }
}
