use thiserror::Error;

pub type Result<T> = std::result::Result<T, DescriptionsError>;

#[derive(Error, Debug)]
pub enum DescriptionsError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Session error: {0}")]
    Session(#[from] session::SessionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod database;
pub mod describe;
pub mod embeddings;
pub mod ingest;
pub mod session;
pub mod upload;
