// Credentials module
// Run-scoped keys resolved from the environment, .env, config file or a prompt


use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use tracing::{debug, warn};

use super::{Config, ConfigError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    OpenAiApiKey,
    QdrantUrl,
    QdrantApiKey,
}

impl CredentialKind {
    pub const ALL: [CredentialKind; 3] = [
        CredentialKind::OpenAiApiKey,
        CredentialKind::QdrantUrl,
        CredentialKind::QdrantApiKey,
    ];

    #[inline]
    pub fn env_var(self) -> &'static str {
        match self {
            CredentialKind::OpenAiApiKey => "OPENAI_API_KEY",
            CredentialKind::QdrantUrl => "QDRANT_URL",
            CredentialKind::QdrantApiKey => "QDRANT_API_KEY",
        }
    }

    #[inline]
    pub fn label(self) -> &'static str {
        match self {
            CredentialKind::OpenAiApiKey => "OpenAI API key",
            CredentialKind::QdrantUrl => "Qdrant URL",
            CredentialKind::QdrantApiKey => "Qdrant API key",
        }
    }

    /// Whether the value should be masked on input and display
    #[inline]
    pub fn is_secret(self) -> bool {
        !matches!(self, CredentialKind::QdrantUrl)
    }

    fn stored_in(self, config: &Config) -> &str {
        match self {
            CredentialKind::OpenAiApiKey => &config.openai.api_key,
            CredentialKind::QdrantUrl => &config.qdrant.url,
            CredentialKind::QdrantApiKey => &config.qdrant.api_key,
        }
    }
}

/// Fully resolved credentials passed to the client constructors
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub openai_api_key: String,
    pub qdrant_url: String,
    pub qdrant_api_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &mask_secret(&self.openai_api_key))
            .field("qdrant_url", &self.qdrant_url)
            .field("qdrant_api_key", &mask_secret(&self.qdrant_api_key))
            .finish()
    }
}

/// Credentials gathered from non-interactive sources, possibly incomplete
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingCredentials {
    values: HashMap<CredentialKind, String>,
}

impl PendingCredentials {
    /// Collects credentials from `lookup` (environment-like sources) first and
    /// falls back to the values stored in `config`. Blank values count as missing.
    #[inline]
    pub fn gather<F>(config: &Config, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut pending = Self::default();

        for kind in CredentialKind::ALL {
            let value = lookup(kind.env_var())
                .filter(|v| !v.trim().is_empty())
                .inspect(|_| debug!("{} taken from {}", kind.label(), kind.env_var()))
                .or_else(|| {
                    let stored = kind.stored_in(config);
                    (!stored.trim().is_empty()).then(|| stored.to_string())
                });

            if let Some(value) = value {
                pending.values.insert(kind, value.trim().to_string());
            }
        }

        pending
    }

    #[inline]
    pub fn get(&self, kind: CredentialKind) -> Option<&str> {
        self.values.get(&kind).map(String::as_str)
    }

    #[inline]
    pub fn set(&mut self, kind: CredentialKind, value: String) {
        let value = value.trim().to_string();
        if value.is_empty() {
            self.values.remove(&kind);
        } else {
            self.values.insert(kind, value);
        }
    }

    /// Credentials that still need a value, in prompt order
    #[inline]
    pub fn missing(&self) -> Vec<CredentialKind> {
        CredentialKind::ALL
            .into_iter()
            .filter(|kind| !self.values.contains_key(kind))
            .collect()
    }

    #[inline]
    pub fn complete(mut self) -> Result<Credentials, ConfigError> {
        if let Some(kind) = self.missing().into_iter().next() {
            return Err(ConfigError::MissingCredential(kind));
        }

        let mut take = |kind| {
            self.values
                .remove(&kind)
                .ok_or(ConfigError::MissingCredential(kind))
        };

        Ok(Credentials {
            openai_api_key: take(CredentialKind::OpenAiApiKey)?,
            qdrant_url: take(CredentialKind::QdrantUrl)?,
            qdrant_api_key: take(CredentialKind::QdrantApiKey)?,
        })
    }
}

/// Reads `KEY=value` pairs from a dotenv file without touching the process
/// environment. A missing or unreadable file yields an empty map.
#[inline]
pub fn read_dotenv(path: &Path) -> HashMap<String, String> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) => {
            debug!("No dotenv file at {}: {}", path.display(), e);
            return HashMap::new();
        }
    };

    let mut values = HashMap::new();
    for item in iter {
        match item {
            Ok((key, value)) => {
                values.insert(key, value);
            }
            Err(e) => warn!("Skipping malformed line in {}: {}", path.display(), e),
        }
    }
    values
}

/// Process environment first, then the dotenv values.
#[inline]
pub fn environment_lookup(
    dotenv: HashMap<String, String>,
) -> impl Fn(&str) -> Option<String> {
    move |key| std::env::var(key).ok().or_else(|| dotenv.get(key).cloned())
}

#[inline]
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), tail)
}
