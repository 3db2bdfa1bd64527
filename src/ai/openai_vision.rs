use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::{AiError, VisionProvider};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_TOKENS: u32 = 300;

/// Instruction sent alongside every photo.
pub const NUTRITION_PROMPT: &str = "Here is a picture of food. Return only a string of comma separated values based on an approximate serving size estimate. If there are multiple food items, return multiple strings. follow this format: Food item (include brand if applicable) (string), calories (int), sugar, fat, protein, iron, carbohydrates. If there is no observable food in the picture, respond with No food detected. Here is an example of a response: Yogurt, *all its nutrition info* \n Jelly Beans, *all its nutrition info* You should return nothing else besides these strings.";

/// Chat-completions client that sends one image per request.
pub struct OpenAiVisionClient {
    endpoint: String,
    api_key: String,
    model: String,
    prompt: String,
    max_tokens: u32,
    client: Client,
}

impl OpenAiVisionClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
            prompt: NUTRITION_PROMPT.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            client: Client::new(),
        }
    }

    /// Point the client at a different chat-completions URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_request_body(&self, image_b64: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": self.prompt },
                        {
                            "type": "image_url",
                            "image_url": { "url": format!("data:image/jpeg;base64,{}", image_b64) }
                        }
                    ]
                }
            ],
            "max_tokens": self.max_tokens
        })
    }
}

/// Pull `choices[0].message.content` out of a completion body.
fn extract_content(body: &Value) -> Result<String, AiError> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            AiError::InvalidResponse("missing choices[0].message.content".into())
        })
}

#[async_trait]
impl VisionProvider for OpenAiVisionClient {
    async fn analyze_image(&self, image_b64: &str) -> Result<String, AiError> {
        let body = self.build_request_body(image_b64);

        log::info!("Requesting analysis from {} ({})", self.endpoint, self.model);
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::Connection(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".into());
            log::error!("Analysis request failed: HTTP {}: {}", status, error_body);
            return Err(AiError::Api {
                status: status.as_u16(),
            });
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| AiError::InvalidResponse(format!("Invalid JSON: {}", e)))?;
        let content = extract_content(&parsed)?;
        log::info!("Analysis received ({} chars)", content.len());
        Ok(content)
    }

    fn name(&self) -> &str {
        "openai-chat-vision"
    }
}
