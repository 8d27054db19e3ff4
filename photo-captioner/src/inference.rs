use crate::traits::CaptionModel;
use crate::types::{CaptionerError, ChatMessage, ChatOptions, ChatRequest, ChatResponse, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

pub const CAPTION_PROMPT: &str = "Describe this image concisely. Then list 15 relevant keywords for search (objects, activities, setting, time, colors).";

pub const CAPTION_OPTIONS: ChatOptions = ChatOptions {
    num_predict: 500,
    temperature: 0.1,
};

/// Builds the single-image, non-streaming chat request used for captioning.
pub fn caption_request(image_base64: &str, model: &str) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        messages: vec![ChatMessage {
            role: "user".to_string(),
            content: CAPTION_PROMPT.to_string(),
            images: vec![image_base64.to_string()],
        }],
        stream: false,
        options: CAPTION_OPTIONS,
    }
}

/// Client for an Ollama-compatible `/api/chat` endpoint.
///
/// Requests have no timeout; large vision models can take minutes on
/// modest hardware.
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("photo-captioner/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    /// Sends `request` and returns the decoded reply without judging it.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        debug!("Sending chat request to {} (model {})", self.chat_url(), request.model);

        let response = self.client.post(self.chat_url()).json(request).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(CaptionerError::RemoteStatus {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let reply: ChatResponse = serde_json::from_slice(&bytes)?;
        Ok(reply)
    }
}

#[async_trait]
impl CaptionModel for OllamaClient {
    async fn infer(&self, image_base64: &str, model: &str) -> Result<String> {
        let reply = self.chat(&caption_request(image_base64, model)).await?;

        // A reply that is not marked done may have been cut off.
        if !reply.done {
            return Err(CaptionerError::IncompleteResponse {
                model: model.to_string(),
            });
        }

        Ok(reply.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caption_request_is_fixed_apart_from_model_and_image() {
        let request = caption_request("aW1hZ2U=", "moondream:latest");
        assert_eq!(request.model, "moondream:latest");
        assert!(!request.stream);
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");
        assert_eq!(request.messages[0].content, CAPTION_PROMPT);
        assert_eq!(request.messages[0].images, vec!["aW1hZ2U=".to_string()]);
        assert_eq!(request.options.num_predict, 500);
        assert!((request.options.temperature - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn chat_url_ignores_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/").unwrap();
        assert_eq!(client.chat_url(), "http://localhost:11434/api/chat");
    }
}
