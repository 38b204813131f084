use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackspecError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Document syntax error: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    ConfigError(#[from] toml::de::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("Unknown discriminator: {0}")]
    DiscriminatorError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Path error: {0}")]
    PathError(String),
}
