use super::{display_secret, load_existing_config, prompt_missing_credentials, test_connection};
use crate::config::{Config, PendingCredentials};
use tempfile::TempDir;

#[test]
fn load_existing_config_falls_back_to_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = load_existing_config(temp_dir.path()).expect("config loaded successfully");
    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert!(!config.openai.embedding_model.is_empty());
    assert!(!config.qdrant.collection.is_empty());
}

#[test]
fn complete_credentials_skip_prompting() {
    let mut config = Config::default();
    config.openai.api_key = "sk-test".to_string();
    config.qdrant.url = "http://localhost:6333".to_string();
    config.qdrant.api_key = "qdrant-key".to_string();

    let pending = PendingCredentials::gather(&config, |_| None);
    let credentials = prompt_missing_credentials(pending).expect("nothing to prompt for");
    assert_eq!(credentials.openai_api_key, "sk-test");
    assert_eq!(credentials.qdrant_url, "http://localhost:6333");
}

#[test]
fn unreachable_service_reports_false() {
    assert!(!test_connection("http://127.0.0.1:1/"));
}

#[test]
fn secrets_are_never_displayed() {
    assert_eq!(display_secret(""), "(not stored)");
    assert_eq!(display_secret("0123456789"), "******6789");
}
