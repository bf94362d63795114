//! Wire types for the OpenAI-compatible chat completions endpoint.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request body for `POST {base_url}/chat/completions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

const PROPOSAL_SYSTEM_PROMPT: &str = "You are an assistant that creates study flashcards. \
Given the user's source text, propose concise question-answer pairs covering its key facts. \
Respond with a JSON array of objects, each with \"front\" and \"back\" string fields.";

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Standard system+user message pair for flashcard proposal generation.
    pub fn proposal_prompt(model: impl Into<String>, source_text: &str) -> Self {
        Self::new(
            model,
            vec![
                ChatMessage::system(PROPOSAL_SYSTEM_PROMPT),
                ChatMessage::user(source_text),
            ],
        )
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Successful completion response.
///
/// Deserialization is the schema check: a 2xx body missing `id`, `model`, or
/// a well-formed `choices[].message` fails here and is never retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub id: String,
    pub choices: Vec<ChatChoice>,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatCompletion {
    /// Content of the first choice, when the provider returned one.
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: Option<u32>,
    #[serde(default)]
    pub completion_tokens: Option<u32>,
    #[serde(default)]
    pub total_tokens: Option<u32>,
}

/// Provider error envelope on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_omits_unset_options() {
        let req = ChatRequest::new("openai/gpt-4o-mini", vec![ChatMessage::user("hi")]);
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("temperature").is_none());
        assert!(json.get("max_tokens").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_request_serializes_options_when_set() {
        let req = ChatRequest::new("m", vec![])
            .with_temperature(0.2)
            .with_max_tokens(512);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["temperature"], 0.2);
        assert_eq!(json["max_tokens"], 512);
    }

    #[test]
    fn test_proposal_prompt_shape() {
        let req = ChatRequest::proposal_prompt("openai/gpt-4o-mini", "Photosynthesis converts light to energy.");
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, MessageRole::System);
        assert_eq!(req.messages[1].role, MessageRole::User);
        assert_eq!(req.messages[1].content, "Photosynthesis converts light to energy.");
    }

    #[test]
    fn test_completion_deserializes_provider_body() {
        let body = r#"{
            "id": "gen-123",
            "model": "openai/gpt-4o-mini",
            "choices": [
                {"message": {"role": "assistant", "content": "[{\"front\":\"Q\",\"back\":\"A\"}]"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 120, "completion_tokens": 40, "total_tokens": 160}
        }"#;
        let completion: ChatCompletion = serde_json::from_str(body).unwrap();
        assert_eq!(completion.id, "gen-123");
        assert!(completion.first_content().unwrap().starts_with("[{"));
        assert_eq!(completion.usage.unwrap().total_tokens, Some(160));
    }

    #[test]
    fn test_completion_rejects_missing_choices() {
        let body = r#"{"id": "gen-123", "model": "m"}"#;
        assert!(serde_json::from_str::<ChatCompletion>(body).is_err());
    }

    #[test]
    fn test_error_envelope_parses_partial_fields() {
        let body = r#"{"error": {"message": "Invalid API key", "type": "auth", "code": "invalid_api_key"}}"#;
        let env: ErrorEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(env.error.code.as_deref(), Some("invalid_api_key"));

        let body = r#"{"error": {"message": "boom"}}"#;
        let env: ErrorEnvelope = serde_json::from_str(body).unwrap();
        assert!(env.error.code.is_none());
    }
}
