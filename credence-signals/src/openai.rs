//! OpenAI-compatible model backend
//!
//! One client serves both remote collaborators that need a hosted model:
//! text embeddings and sentiment classification.

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
        CreateEmbeddingRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use credence_core::EMBEDDING_DIM;

use crate::{Embedder, SentimentClassifier, SentimentLabel, SignalError};

/// Characters of article text sent to the classifier
pub const CLASSIFIER_MAX_CHARS: usize = 512;

const SENTIMENT_SYSTEM_PROMPT: &str = r#"
You are a sentiment classifier for news text.
Classify the overall sentiment of the user's text.
Respond with JSON only, no prose:
{"label": "POSITIVE" | "NEGATIVE" | "NEUTRAL", "score": <confidence between 0 and 1>}
"#;

/// OpenAI-compatible backend configuration
#[derive(Debug, Clone)]
pub struct ModelBackendConfig {
    pub api_key: String,
    /// Base URL (for OpenRouter, local servers, etc.)
    pub base_url: Option<String>,
    pub embedding_model: String,
    pub sentiment_model: String,
    pub embedding_dimensions: usize,
}

impl Default for ModelBackendConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            embedding_model: "text-embedding-3-small".to_string(),
            sentiment_model: "gpt-4o-mini".to_string(),
            embedding_dimensions: EMBEDDING_DIM,
        }
    }
}

impl ModelBackendConfig {
    pub fn openai(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_string());
        self
    }
}

/// Hosted embedding + sentiment client
pub struct ModelBackend {
    client: Client<OpenAIConfig>,
    config: ModelBackendConfig,
}

impl ModelBackend {
    pub fn new(config: ModelBackendConfig) -> Result<Self, SignalError> {
        if config.api_key.trim().is_empty() {
            return Err(SignalError::Disabled("model backend API key".to_string()));
        }

        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);
        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Ok(Self {
            client: Client::with_config(openai_config),
            config,
        })
    }
}

#[async_trait]
impl Embedder for ModelBackend {
    fn name(&self) -> &str {
        &self.config.embedding_model
    }

    fn dimensions(&self) -> usize {
        self.config.embedding_dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, SignalError> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.config.embedding_model)
            .input(text)
            .dimensions(self.config.embedding_dimensions as u32)
            .build()
            .map_err(|e| SignalError::Embedding(e.to_string()))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| SignalError::Embedding(e.to_string()))?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| SignalError::Embedding("empty embedding response".to_string()))?;

        if embedding.len() != self.config.embedding_dimensions {
            return Err(SignalError::Embedding(format!(
                "expected {} dimensions, got {}",
                self.config.embedding_dimensions,
                embedding.len()
            )));
        }
        Ok(embedding)
    }
}

#[async_trait]
impl SentimentClassifier for ModelBackend {
    async fn classify(&self, text: &str) -> Result<SentimentLabel, SignalError> {
        let input: String = text.chars().take(CLASSIFIER_MAX_CHARS).collect();
        let classification_error = |e: String| SignalError::Classification(e);

        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SENTIMENT_SYSTEM_PROMPT)
                    .build()
                    .map_err(|e| classification_error(e.to_string()))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(input)
                    .build()
                    .map_err(|e| classification_error(e.to_string()))?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.sentiment_model)
            .messages(messages)
            .temperature(0.0)
            .max_tokens(64u32)
            .build()
            .map_err(|e| classification_error(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| classification_error(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| classification_error("empty response".to_string()))?;

        debug!("Sentiment model replied: {}", content);
        parse_sentiment_reply(&content)
    }
}

#[derive(Debug, Deserialize)]
struct SentimentReply {
    label: String,
    score: f64,
}

/// Parse the classifier's JSON reply, tolerating code fences
pub fn parse_sentiment_reply(content: &str) -> Result<SentimentLabel, SignalError> {
    let start = content.find('{');
    let end = content.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if e > s => &content[s..=e],
        _ => {
            return Err(SignalError::Classification(format!(
                "no JSON object in reply: {}",
                content
            )))
        }
    };

    let reply: SentimentReply =
        serde_json::from_str(json).map_err(|e| SignalError::Classification(e.to_string()))?;

    Ok(SentimentLabel {
        label: reply.label.trim().to_uppercase(),
        score: reply.score.clamp(0.0, 1.0),
    })
}
