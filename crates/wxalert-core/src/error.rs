//! Error types for wxalert

use thiserror::Error;

/// Result type alias using wxalert's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for wxalert operations
#[derive(Error, Debug)]
pub enum Error {
    /// Fetching or decoding a reading for one location failed
    #[error("Provider error for {location}: {message}")]
    Provider { location: String, message: String },

    /// A pass obtained zero readings across all locations
    #[error("No weather data retrieved")]
    NoReadings,

    /// Notification delivery failed
    #[error("Notification error: {0}")]
    Notification(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration source could not be loaded or deserialized
    #[error("Configuration error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a provider error for a location
    pub fn provider(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a notification error
    pub fn notification(msg: impl Into<String>) -> Self {
        Self::Notification(msg.into())
    }
}
