#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

use std::io::Cursor;

use image::{ImageBuffer, ImageFormat, Rgb};
use image_descriptions::commands::{DescribeOptions, describe_with};
use image_descriptions::config::{Config, Credentials};
use image_descriptions::database::{PointId, QdrantClient};
use image_descriptions::describe::DescriptionMode;
use image_descriptions::embeddings::OpenAiClient;
use image_descriptions::ingest::DescriptionStore;
use image_descriptions::upload::UploadedImage;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DESCRIPTION: &str = "A red square on a white background.";

fn red_square_png() -> Vec<u8> {
    let image = ImageBuffer::from_pixel(10, 10, Rgb([255_u8, 0, 0]));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("png should encode");
    bytes.into_inner()
}

fn credentials_for(server: &MockServer) -> Credentials {
    Credentials {
        openai_api_key: "sk-test".to_string(),
        qdrant_url: server.uri(),
        qdrant_api_key: "qdrant-key".to_string(),
    }
}

fn config_for(server: &MockServer, dir: &TempDir) -> Config {
    let mut config = Config::load(dir.path()).expect("default config");
    config
        .openai
        .set_base_url(format!("{}/v1", server.uri()))
        .expect("valid base url");
    config
}

async fn mount_openai(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-4o" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": DESCRIPTION } }]
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(body_partial_json(json!({ "model": "text-embedding-3-large" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "index": 0, "embedding": vec![0.01_f32; 3072] }]
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn describe_and_save_against_remote_services() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("should create temp dir");
    mount_openai(&server).await;

    Mock::given(method("GET"))
        .and(path("/collections/image_descriptions/exists"))
        .and(header("api-key", "qdrant-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "exists": false }, "status": "ok", "time": 0.0
        })))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/collections/image_descriptions"))
        .and(body_partial_json(json!({
            "vectors": { "size": 3072, "distance": "Cosine" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": true, "status": "ok", "time": 0.0
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/collections/image_descriptions/points"))
        .and(query_param("wait", "true"))
        .and(body_partial_json(json!({
            "points": [{ "payload": { "text": DESCRIPTION } }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "operation_id": 1, "status": "completed" }, "status": "ok", "time": 0.0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server, &dir);
    let credentials = credentials_for(&server);

    let id = tokio::task::spawn_blocking(move || {
        let openai = OpenAiClient::new(&config.openai, &credentials).expect("openai client");
        let index = QdrantClient::new(&credentials).expect("qdrant client");
        let store = DescriptionStore::new(&index, &openai, config.qdrant.collection.clone());
        store.ensure_collection().expect("collection created");

        let image = UploadedImage::from_bytes("square.png", red_square_png()).expect("png loads");
        let options = DescribeOptions {
            mode: Some(DescriptionMode::ModelGenerated),
            text: None,
            assume_yes: true,
        };
        describe_with(&store, &openai, image, &options)
    })
    .await
    .expect("task should not panic")
    .expect("describe succeeds")
    .expect("saved with --yes");

    assert!(matches!(id, PointId::Uuid(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn index_failure_surfaces_http_status() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("should create temp dir");

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "index": 0, "embedding": vec![0.01_f32; 3072] }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/collections/image_descriptions/exists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "exists": true }
        })))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/collections/image_descriptions/points"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let config = config_for(&server, &dir);
    let credentials = credentials_for(&server);

    let result = tokio::task::spawn_blocking(move || {
        let openai = OpenAiClient::new(&config.openai, &credentials).expect("openai client");
        let index = QdrantClient::new(&credentials).expect("qdrant client");
        let store = DescriptionStore::new(&index, &openai, config.qdrant.collection.clone());
        store.save("red square")
    })
    .await
    .expect("task should not panic");

    let err = result.expect_err("forbidden upsert fails");
    assert!(format!("{:#}", err).contains("403"));
}
