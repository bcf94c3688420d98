// Configuration management module
// TOML settings, run-scoped credentials and the interactive setup

pub mod credentials;
pub mod interactive;
pub mod settings;


pub use credentials::{CredentialKind, Credentials, PendingCredentials};
pub use interactive::{prompt_missing_credentials, run_interactive_config, show_config};
pub use settings::{Config, ConfigError, OpenAiConfig, QdrantConfig, parse_service_url};
