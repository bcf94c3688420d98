use super::*;
use crate::DescriptionsError;
use crate::embeddings::{MessageContent, Role};
use std::sync::Mutex;

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];

/// Records the messages it receives and answers with a canned reply
struct RecordingChat {
    reply: String,
    received: Mutex<Vec<Vec<ChatMessage>>>,
}

impl RecordingChat {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            received: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.received.lock().expect("lock").clone()
    }
}

impl ChatModel for RecordingChat {
    fn chat_complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.received.lock().expect("lock").push(messages.to_vec());
        Ok(self.reply.clone())
    }
}

struct BrokenChat;

impl ChatModel for BrokenChat {
    fn chat_complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        Err(DescriptionsError::Model("HTTP 500".to_string()))
    }
}

fn image_url_of(message: &ChatMessage) -> &str {
    match &message.content {
        MessageContent::Parts(parts) => match parts.as_slice() {
            [ContentPart::ImageUrl { image_url }] => &image_url.url,
            other => panic!("unexpected parts: {:?}", other),
        },
        MessageContent::Text(text) => panic!("unexpected text content: {}", text),
    }
}

#[test]
fn manual_mode_ignores_input() {
    let chat = RecordingChat::new("unused");
    let describer = Describer::for_mode(DescriptionMode::Manual, &chat);

    for bytes in [&b""[..], PNG_MAGIC, &[0xFF; 64][..]] {
        let text = describer.generate_description(bytes).expect("manual never fails");
        assert_eq!(text, MANUAL_PLACEHOLDER);
    }
    assert!(chat.calls().is_empty());
    assert_eq!(describer.mode(), DescriptionMode::Manual);
}

#[test]
fn model_mode_sends_base64_and_returns_reply_verbatim() {
    let chat = RecordingChat::new("  A red square on a white background.\n");
    let describer = Describer::for_mode(DescriptionMode::ModelGenerated, &chat);

    let text = describer
        .generate_description(PNG_MAGIC)
        .expect("model call succeeds");
    assert_eq!(text, "  A red square on a white background.\n");

    let calls = chat.calls();
    assert_eq!(calls.len(), 1);
    let messages = &calls[0];
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(
        messages[0].content,
        MessageContent::Text(SYSTEM_INSTRUCTION.to_string())
    );
    assert_eq!(messages[1].role, Role::User);

    let expected = format!("data:image/png;base64,{}", STANDARD.encode(PNG_MAGIC));
    assert_eq!(image_url_of(&messages[1]), expected);
}

#[test]
fn unknown_bytes_fall_back_to_png_mime() {
    let messages = image_messages(b"abc");
    assert_eq!(image_url_of(&messages[1]), "data:image/png;base64,YWJj");
}

#[test]
fn jpeg_bytes_get_jpeg_mime() {
    let jpeg_header = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
    let messages = image_messages(&jpeg_header);
    assert!(image_url_of(&messages[1]).starts_with("data:image/jpeg;base64,"));
}

#[test]
fn model_errors_propagate() {
    let describer = Describer::ModelGenerated(&BrokenChat);
    let err = describer
        .generate_description(PNG_MAGIC)
        .expect_err("model failure surfaces");
    assert!(err.to_string().contains("HTTP 500"));
}

#[test]
fn mode_names_for_cli() {
    use clap::ValueEnum;

    let names: Vec<String> = DescriptionMode::value_variants()
        .iter()
        .filter_map(|mode| mode.to_possible_value())
        .map(|value| value.get_name().to_string())
        .collect();
    assert_eq!(names, vec!["model", "manual"]);
    assert_eq!(
        DescriptionMode::from_str("model-generated", true),
        Ok(DescriptionMode::ModelGenerated)
    );
}
