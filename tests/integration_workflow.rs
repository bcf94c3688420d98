#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{ImageBuffer, ImageFormat, Rgb};
use image_descriptions::commands::{DescribeOptions, describe_with};
use image_descriptions::database::{MemoryIndex, PointId, VectorIndex};
use image_descriptions::describe::{DescriptionMode, Describer, MANUAL_PLACEHOLDER};
use image_descriptions::embeddings::{ChatMessage, ChatModel, EMBEDDING_DIMENSION, Embedder};
use image_descriptions::ingest::DescriptionStore;
use image_descriptions::session::{Session, StateKind};
use image_descriptions::upload::UploadedImage;
use serde_json::json;
use tempfile::TempDir;

const COLLECTION: &str = "image_descriptions";

/// Folds text bytes into a full-size vector so similar texts land close together
struct HashingEmbedder {
    calls: AtomicUsize,
}

impl HashingEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> image_descriptions::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let dimension = self.dimension();
        let mut vector = vec![0.0; dimension];
        for (position, byte) in text.bytes().enumerate() {
            vector[(usize::from(byte) * 31 + position) % dimension] += 1.0;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION as usize
    }
}

struct CannedChat(&'static str);

impl ChatModel for CannedChat {
    fn chat_complete(&self, _messages: &[ChatMessage]) -> image_descriptions::Result<String> {
        Ok(self.0.to_string())
    }
}

fn red_square_png() -> Vec<u8> {
    let image = ImageBuffer::from_pixel(10, 10, Rgb([255_u8, 0, 0]));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("png should encode");
    bytes.into_inner()
}

fn stored_payload(index: &MemoryIndex, id: PointId) -> serde_json::Value {
    let points = index.retrieve(COLLECTION, &[id]).expect("retrieve");
    assert_eq!(points.len(), 1);
    serde_json::to_value(&points[0].payload).expect("payload serializes")
}

#[test]
fn manual_description_of_png_file_is_saved() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("square.png");
    std::fs::write(&path, red_square_png()).expect("should write png");

    let index = MemoryIndex::new();
    let embedder = HashingEmbedder::new();
    let chat = CannedChat("never used in manual mode");
    let store = DescriptionStore::new(&index, &embedder, COLLECTION);
    store.ensure_collection().expect("ensure collection");
    let before = store.count().expect("count");

    let image = UploadedImage::from_path(&path).expect("png loads");
    assert_eq!((image.width, image.height), (10, 10));
    assert!(image.preview_line().starts_with("square.png (PNG, 10x10, "));

    let mut session = Session::new();
    session.load_image(image);

    let describer = Describer::for_mode(DescriptionMode::Manual, &chat);
    let draft = session.generate(&describer).expect("generate");
    assert_eq!(draft, MANUAL_PLACEHOLDER);

    session.edit("red square").expect("edit");
    let id = session.save(&store).expect("save");

    assert_eq!(session.state().kind(), StateKind::Saved);
    assert_eq!(store.count().expect("count"), before + 1);
    assert_eq!(stored_payload(&index, id), json!({ "text": "red square" }));
}

#[test]
fn model_description_is_saved_without_prompts() {
    let index = MemoryIndex::new();
    let embedder = HashingEmbedder::new();
    let chat = CannedChat("A red square on a plain background.");
    let store = DescriptionStore::new(&index, &embedder, COLLECTION);

    let image = UploadedImage::from_bytes("square.png", red_square_png()).expect("png loads");
    let options = DescribeOptions {
        mode: Some(DescriptionMode::ModelGenerated),
        text: Some("A red square on a plain background.".to_string()),
        assume_yes: true,
    };

    let id = describe_with(&store, &chat, image, &options)
        .expect("describe succeeds")
        .expect("saved with --yes");

    assert_eq!(store.count().expect("count"), 1);
    assert_eq!(
        stored_payload(&index, id),
        json!({ "text": "A red square on a plain background." })
    );
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn blank_text_is_refused_before_embedding() {
    let index = MemoryIndex::new();
    let embedder = HashingEmbedder::new();
    let chat = CannedChat("unused");
    let store = DescriptionStore::new(&index, &embedder, COLLECTION);

    let image = UploadedImage::from_bytes("square.png", red_square_png()).expect("png loads");
    let options = DescribeOptions {
        mode: Some(DescriptionMode::Manual),
        text: Some("   ".to_string()),
        assume_yes: true,
    };

    assert!(describe_with(&store, &chat, image, &options).is_err());
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    assert!(!index.collection_exists(COLLECTION).expect("exists"));
}

#[test]
fn saved_descriptions_are_searchable() {
    let index = MemoryIndex::new();
    let embedder = HashingEmbedder::new();
    let store = DescriptionStore::new(&index, &embedder, COLLECTION);

    let square = store.save("red square").expect("save");
    store.save("a dog running on the beach").expect("save");
    store.save("mountains at sunset").expect("save");

    let hits = store.search("red square", 2).expect("search");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, square);
    assert_eq!(hits[0].text, "red square");
    assert!(hits[0].score >= hits[1].score);
}

#[test]
fn concurrent_sessions_keep_both_descriptions() {
    let index = MemoryIndex::new();
    let embedder = HashingEmbedder::new();
    let chat = CannedChat("unused");
    let store = DescriptionStore::new(&index, &embedder, COLLECTION);
    store.ensure_collection().expect("ensure collection");

    let run = |text: &'static str| {
        let image = UploadedImage::from_bytes("square.png", red_square_png()).expect("png loads");
        let options = DescribeOptions {
            mode: Some(DescriptionMode::Manual),
            text: Some(text.to_string()),
            assume_yes: true,
        };
        describe_with(&store, &chat, image, &options)
            .expect("describe succeeds")
            .expect("saved")
    };

    let (a, b) = std::thread::scope(|scope| {
        let a = scope.spawn(|| run("a"));
        let b = scope.spawn(|| run("b"));
        (a.join().expect("thread a"), b.join().expect("thread b"))
    });

    assert_ne!(a, b);
    assert_eq!(store.count().expect("count"), 2);
    assert_eq!(store.get(a).expect("get").as_deref(), Some("a"));
    assert_eq!(store.get(b).expect("get").as_deref(), Some("b"));
}
