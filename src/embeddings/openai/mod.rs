
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use super::{ChatMessage, ChatModel, EMBEDDING_DIMENSION, Embedder};
use crate::config::{Credentials, OpenAiConfig, parse_service_url};
use crate::{DescriptionsError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Blocking client for the OpenAI embeddings and chat-completions endpoints
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: Url,
    api_key: String,
    embedding_model: String,
    chat_model: String,
    dimension: usize,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
    /// Shortened output size, sent only when it differs from the model default
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl OpenAiClient {
    #[inline]
    pub fn new(config: &OpenAiConfig, credentials: &Credentials) -> Result<Self> {
        if credentials.openai_api_key.trim().is_empty() {
            return Err(crate::config::ConfigError::MissingCredential(
                crate::config::CredentialKind::OpenAiApiKey,
            )
            .into());
        }

        let mut base_url = parse_service_url(&config.base_url)?;
        // Url::join replaces the last segment unless the path ends with a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            api_key: credentials.openai_api_key.clone(),
            embedding_model: config.embedding_model.clone(),
            chat_model: config.chat_model.clone(),
            dimension: config.embedding_dimension as usize,
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    fn requested_dimensions(&self) -> Option<usize> {
        (self.dimension != EMBEDDING_DIMENSION as usize).then_some(self.dimension)
    }

    /// Checks that the API is reachable and accepts the key
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        let url = self.endpoint("models")?;
        debug!("Checking OpenAI API at {}", url);

        self.agent
            .get(url.as_str())
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| request_error("health check", e))?;

        info!("OpenAI API reachable at {}", self.base_url);
        Ok(())
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| DescriptionsError::Model(format!("Failed to build {} URL: {}", path, e)))
    }

    fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<String> {
        let url = self.endpoint(path)?;
        let request_json = serde_json::to_string(body).map_err(|e| {
            DescriptionsError::Model(format!("Failed to serialize {} request: {}", path, e))
        })?;

        debug!("POST {} ({} bytes)", url, request_json.len());

        self.agent
            .post(url.as_str())
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| request_error(path, e))
    }
}

impl Embedder for OpenAiClient {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", text.len());

        let request = EmbedRequest {
            model: &self.embedding_model,
            input: [text],
            dimensions: self.requested_dimensions(),
        };
        let response_text = self.post_json("embeddings", &request)?;

        let response: EmbedResponse = serde_json::from_str(&response_text).map_err(|e| {
            DescriptionsError::Model(format!("Failed to parse embedding response: {}", e))
        })?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| DescriptionsError::Model("No embedding returned".to_string()))?;

        if embedding.len() != self.dimension {
            return Err(DescriptionsError::Model(format!(
                "Embedding has {} dimensions, expected {}",
                embedding.len(),
                self.dimension
            )));
        }

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

impl ChatModel for OpenAiClient {
    fn chat_complete(&self, messages: &[ChatMessage]) -> Result<String> {
        debug!(
            "Requesting chat completion from {} ({} messages)",
            self.chat_model,
            messages.len()
        );

        let request = ChatRequest {
            model: &self.chat_model,
            messages,
        };
        let response_text = self.post_json("chat/completions", &request)?;

        let response: ChatResponse = serde_json::from_str(&response_text).map_err(|e| {
            DescriptionsError::Model(format!("Failed to parse chat response: {}", e))
        })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| DescriptionsError::Model("Chat response had no content".to_string()))
    }
}

fn request_error(what: &str, error: ureq::Error) -> DescriptionsError {
    match error {
        ureq::Error::StatusCode(status) => {
            DescriptionsError::Model(format!("OpenAI {} request failed: HTTP {}", what, status))
        }
        other => DescriptionsError::Model(format!("OpenAI {} request failed: {}", what, other)),
    }
}
