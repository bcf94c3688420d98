#[cfg(test)]
mod tests;

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Password};

use super::credentials::{CredentialKind, Credentials, PendingCredentials, mask_secret};
use super::{Config, ConfigError, OpenAiConfig, QdrantConfig, parse_service_url};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Image Descriptions Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("OpenAI Configuration").bold().yellow());
    eprintln!("Models used to describe images and embed descriptions.");
    eprintln!();
    configure_openai(&mut config.openai)?;

    eprintln!();
    eprintln!("{}", style("Qdrant Configuration").bold().yellow());
    eprintln!("Vector index the descriptions are stored in.");
    eprintln!();
    configure_qdrant(&mut config.qdrant)?;

    eprintln!();
    if Confirm::new()
        .with_prompt("Store API keys in the config file? (otherwise they are read from the environment or asked for on each run)")
        .default(false)
        .interact()?
    {
        config.openai.api_key = Password::new()
            .with_prompt(CredentialKind::OpenAiApiKey.label())
            .allow_empty_password(true)
            .interact()?;
        config.qdrant.api_key = Password::new()
            .with_prompt(CredentialKind::QdrantApiKey.label())
            .allow_empty_password(true)
            .interact()?;
    }

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());
    report_connection("OpenAI", &config.openai.base_url);
    if !config.qdrant.url.is_empty() {
        report_connection("Qdrant", &config.qdrant.url);
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("OpenAI Settings:").bold().yellow());
    eprintln!("  Base URL: {}", style(&config.openai.base_url).cyan());
    eprintln!("  API Key: {}", style(display_secret(&config.openai.api_key)).cyan());
    eprintln!("  Embedding Model: {}", style(&config.openai.embedding_model).cyan());
    eprintln!(
        "  Embedding Dimension: {}",
        style(config.openai.embedding_dimension).cyan()
    );
    eprintln!("  Chat Model: {}", style(&config.openai.chat_model).cyan());

    eprintln!();
    eprintln!("{}", style("Qdrant Settings:").bold().yellow());
    if config.qdrant.url.is_empty() {
        eprintln!("  URL: {}", style("(not set)").dim());
    } else {
        eprintln!("  URL: {}", style(&config.qdrant.url).cyan());
    }
    eprintln!("  API Key: {}", style(display_secret(&config.qdrant.api_key)).cyan());
    eprintln!("  Collection: {}", style(&config.qdrant.collection).cyan());

    eprintln!();
    eprintln!("Config file: {}", style(config.config_file_path().display()).dim());

    Ok(())
}

/// Prompts for every credential `pending` is still missing. Fails with
/// [`ConfigError::MissingCredential`] when nobody is attending the terminal.
#[inline]
pub fn prompt_missing_credentials(mut pending: PendingCredentials) -> Result<Credentials> {
    let missing = pending.missing();
    if missing.is_empty() {
        return Ok(pending.complete()?);
    }

    if !console::user_attended_stderr() {
        return Err(ConfigError::MissingCredential(missing[0]).into());
    }

    for kind in missing {
        eprintln!(
            "{}",
            style(format!(
                "Add your {} to use this tool (or set {})",
                kind.label(),
                kind.env_var()
            ))
            .yellow()
        );
        let value = prompt_credential(kind)?;
        pending.set(kind, value);
    }

    Ok(pending.complete()?)
}

fn prompt_credential(kind: CredentialKind) -> Result<String> {
    if kind.is_secret() {
        return Ok(Password::new().with_prompt(kind.label()).interact()?);
    }

    Ok(Input::<String>::new()
        .with_prompt(kind.label())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            parse_service_url(input).map(|_| ())
        })
        .interact_text()?)
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_openai(openai: &mut OpenAiConfig) -> Result<()> {
    let base_url: String = Input::new()
        .with_prompt("OpenAI API base URL")
        .default(openai.base_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            parse_service_url(input).map(|_| ())
        })
        .interact_text()?;

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(openai.embedding_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let embedding_dimension: u32 = Input::new()
        .with_prompt("Embedding dimension")
        .default(openai.embedding_dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;

    let chat_model: String = Input::new()
        .with_prompt("Vision chat model")
        .default(openai.chat_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    openai.set_base_url(base_url)?;
    openai.set_embedding_model(embedding_model)?;
    openai.set_embedding_dimension(embedding_dimension)?;
    openai.set_chat_model(chat_model)?;

    Ok(())
}

fn configure_qdrant(qdrant: &mut QdrantConfig) -> Result<()> {
    let url: String = Input::new()
        .with_prompt("Qdrant URL (leave empty to read QDRANT_URL at runtime)")
        .default(qdrant.url.clone())
        .allow_empty(true)
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            if input.trim().is_empty() {
                Ok(())
            } else {
                parse_service_url(input).map(|_| ())
            }
        })
        .interact_text()?;

    let collection: String = Input::new()
        .with_prompt("Collection name")
        .default(qdrant.collection.clone())
        .interact_text()?;

    if url.trim().is_empty() {
        qdrant.url = String::new();
    } else {
        qdrant.set_url(url.trim().to_string())?;
    }
    qdrant.set_collection(collection)?;

    Ok(())
}

fn report_connection(service: &str, url: &str) {
    if test_connection(url) {
        eprintln!("{}", style(format!("✓ {} is reachable", service)).green());
    } else {
        eprintln!(
            "{}",
            style(format!("⚠ Warning: Could not reach {} at {}", service, url)).yellow()
        );
    }
}

fn test_connection(url: &str) -> bool {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(url).call() {
        Ok(_) => true,
        // Authentication failures still prove the service is there
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}

fn display_secret(secret: &str) -> String {
    if secret.is_empty() {
        "(not stored)".to_string()
    } else {
        mask_secret(secret)
    }
}
