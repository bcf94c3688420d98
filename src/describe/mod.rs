// Description generation module
// Produces the first draft of a description from image bytes

#[cfg(test)]
mod tests;

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

use crate::Result;
use crate::embeddings::{ChatMessage, ChatModel, ContentPart, ImageUrl};

/// Instruction sent with every image in model mode
pub const SYSTEM_INSTRUCTION: &str = "Describe this image.";
/// Draft returned in manual mode, to be replaced by the user's own text
pub const MANUAL_PLACEHOLDER: &str = "Image description - typed manually";

const FALLBACK_MIME_TYPE: &str = "image/png";

/// How descriptions are drafted, chosen once per session
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DescriptionMode {
    /// A vision model describes the image
    #[value(name = "model", alias = "model-generated")]
    ModelGenerated,
    /// The user types the description
    Manual,
}

impl DescriptionMode {
    pub const ALL: [DescriptionMode; 2] = [DescriptionMode::ModelGenerated, DescriptionMode::Manual];
}

impl fmt::Display for DescriptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptionMode::ModelGenerated => write!(f, "Generated by the vision model"),
            DescriptionMode::Manual => write!(f, "Typed manually"),
        }
    }
}

/// Drafts descriptions according to the selected [`DescriptionMode`]
pub enum Describer<'a> {
    ModelGenerated(&'a dyn ChatModel),
    Manual,
}

impl<'a> Describer<'a> {
    /// Builds the describer for `mode`. The chat model is only used in model mode.
    #[inline]
    pub fn for_mode(mode: DescriptionMode, chat: &'a dyn ChatModel) -> Self {
        match mode {
            DescriptionMode::ModelGenerated => Describer::ModelGenerated(chat),
            DescriptionMode::Manual => Describer::Manual,
        }
    }

    #[inline]
    pub fn mode(&self) -> DescriptionMode {
        match self {
            Describer::ModelGenerated(_) => DescriptionMode::ModelGenerated,
            Describer::Manual => DescriptionMode::Manual,
        }
    }

    /// Model mode returns the model's text unmodified; manual mode always
    /// returns [`MANUAL_PLACEHOLDER`].
    #[inline]
    pub fn generate_description(&self, image_bytes: &[u8]) -> Result<String> {
        match self {
            Describer::ModelGenerated(chat) => {
                let messages = image_messages(image_bytes);
                debug!("Requesting description for {} bytes", image_bytes.len());
                chat.chat_complete(&messages)
            }
            Describer::Manual => Ok(MANUAL_PLACEHOLDER.to_string()),
        }
    }
}

/// System instruction plus the image as a base64 data URL
#[inline]
pub fn image_messages(image_bytes: &[u8]) -> Vec<ChatMessage> {
    let mime_type = image::guess_format(image_bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or(FALLBACK_MIME_TYPE);

    vec![
        ChatMessage::system(SYSTEM_INSTRUCTION),
        ChatMessage::user(vec![ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: format!("data:{};base64,{}", mime_type, STANDARD.encode(image_bytes)),
            },
        }]),
    ]
}
