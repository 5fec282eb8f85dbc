use thiserror::Error;

#[derive(Error, Debug)]
pub enum PfbFhirError {
    #[error("Schema error: {message}")]
    Schema { message: String },

    #[error("Resolution error: {message}")]
    Resolution { message: String },

    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl PfbFhirError {
    pub fn schema_error<S: Into<String>>(message: S) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    pub fn resolution_error<S: Into<String>>(message: S) -> Self {
        Self::Resolution {
            message: message.into(),
        }
    }

    pub fn configuration_error<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn unknown_entity<S: Into<String>>(entity_id: S) -> Self {
        Self::UnknownEntity(entity_id.into())
    }
}

pub type Result<T> = std::result::Result<T, PfbFhirError>;
