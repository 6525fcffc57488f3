//! OpenAI-compatible chat completions client
//!
//! Used for both food identification (image + prompt) and advice generation
//! (text only). The image travels inline as a base64 `data:` URL.

use super::{build_http_client, record_failure, reject_unless_success, transport_error, TextModel, TextRequest, VisionModel};
use crate::config::AiConfig;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use nutriscan_shared::errors::{PipelineError, UpstreamService};
use nutriscan_shared::models::FoodImage;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Completion budget for the three-line identification answer
const VISION_MAX_TOKENS: u32 = 150;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Chat completions client bound to one model
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    service: UpstreamService,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<SecretString>,
        model: impl Into<String>,
        service: UpstreamService,
        timeout: std::time::Duration,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            service,
            client: build_http_client(timeout)?,
        })
    }

    /// Client for the food identification stage
    pub fn vision(config: &AiConfig) -> Result<Self, PipelineError> {
        Self::new(
            config.base_url.clone(),
            config.api_key.clone(),
            config.vision_model.clone(),
            UpstreamService::VisionModel,
            config.timeout(),
        )
    }

    /// Client for advice generation
    pub fn advice(config: &AiConfig) -> Result<Self, PipelineError> {
        Self::new(
            config.base_url.clone(),
            config.api_key.clone(),
            config.advice_model.clone(),
            UpstreamService::AdviceModel,
            config.timeout(),
        )
    }

    /// The key, or a configuration error raised before any network I/O
    fn api_key(&self) -> Result<&str, PipelineError> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret().as_str())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                PipelineError::Configuration(format!(
                    "API key for {} is not configured",
                    self.service
                ))
            })
    }

    async fn complete(&self, request: ChatRequest<'_>) -> Result<String, PipelineError> {
        let api_key = self.api_key()?;
        let url = format!("{}/chat/completions", self.base_url);

        debug!(service = %self.service, model = %self.model, "Calling chat completions");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(self.service, e))?;

        let response = reject_unless_success(self.service, response).await?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| transport_error(self.service, e))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| {
                let err = PipelineError::malformed(self.service, "response has no choices");
                record_failure(&err);
                err
            })?
            .message
            .content
            .unwrap_or_default();

        debug!(service = %self.service, chars = content.chars().count(), "Chat completion received");
        Ok(content)
    }
}

#[async_trait]
impl VisionModel for OpenAiClient {
    async fn describe_image(&self, prompt: &str, image: &FoodImage) -> Result<String, PipelineError> {
        let encoded = general_purpose::STANDARD.encode(&image.bytes);
        let data_url = format!("data:{};base64,{}", image.mime_type, encoded);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: prompt.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ]),
            }],
            max_tokens: VISION_MAX_TOKENS,
            temperature: None,
        };

        self.complete(request).await
    }
}

#[async_trait]
impl TextModel for OpenAiClient {
    async fn generate(&self, request: TextRequest) -> Result<String, PipelineError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(request.system),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Text(request.prompt),
                },
            ],
            max_tokens: request.max_tokens,
            temperature: Some(request.temperature),
        };

        self.complete(request).await
    }
}
