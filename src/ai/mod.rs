use async_trait::async_trait;

pub mod openai_vision;
pub mod types;
pub use types::*;

/// Trait for vision-language providers (OpenAI chat completions, mocks).
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Analyze one image and return the model's text reply.
    /// `image_b64` is base64-encoded JPEG.
    /// Exactly one request is made; failures are not retried.
    async fn analyze_image(&self, image_b64: &str) -> Result<String, AiError>;

    /// Provider name for logging/display
    fn name(&self) -> &str;
}
