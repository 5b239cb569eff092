//! Error types for Cinder

use thiserror::Error;

/// The main error type for Cinder operations
#[derive(Debug, Error)]
pub enum CinderError {
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    #[error("Duplicate entity name: {0}")]
    DuplicateEntityName(String),

    #[error("Hierarchy error: {0}")]
    HierarchyError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    #[error("Value out of range: {field} must be between {min} and {max}, got {value}")]
    ValueOutOfRange {
        field: String,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("Setup error: {0}")]
    Setup(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("Scene error: {0}")]
    SceneError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("TOML serialization error: {0}")]
    TomlSerError(String),
}

/// Result type alias for Cinder operations
pub type Result<T> = std::result::Result<T, CinderError>;

impl From<toml::de::Error> for CinderError {
    fn from(err: toml::de::Error) -> Self {
        CinderError::TomlParseError(err.to_string())
    }
}

impl From<toml::ser::Error> for CinderError {
    fn from(err: toml::ser::Error) -> Self {
        CinderError::TomlSerError(err.to_string())
    }
}
