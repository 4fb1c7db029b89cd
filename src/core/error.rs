use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    Transport(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl PolicyError {
    /// Message suitable for a toast or banner
    pub fn user_message(&self) -> String {
        match self {
            PolicyError::Validation(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<toml::de::Error> for PolicyError {
    fn from(e: toml::de::Error) -> Self {
        PolicyError::ConfigError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PolicyError>;
