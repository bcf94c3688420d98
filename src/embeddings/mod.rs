// Embeddings module
// Text embedding and chat model access behind small traits

pub mod openai;

use serde::{Deserialize, Serialize};

pub use openai::OpenAiClient;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o";
/// Output size of `text-embedding-3-large`
pub const EMBEDDING_DIMENSION: u32 = 3072;

/// Turns a piece of text into a fixed-length vector
pub trait Embedder: Send + Sync {
    /// Embeds a single input. The result always has [`Embedder::dimension`] entries.
    fn embed(&self, text: &str) -> crate::Result<Vec<f32>>;

    fn dimension(&self) -> usize;
}

/// A chat-completion capable model
pub trait ChatModel: Send + Sync {
    /// Returns the content of the first choice, unmodified
    fn chat_complete(&self, messages: &[ChatMessage]) -> crate::Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

impl ChatMessage {
    #[inline]
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    #[inline]
    pub fn user(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(parts),
        }
    }
}
