use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Store unreachable: {0}")]
    Connectivity(String),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Extraction error: {message}")]
    Extraction { message: String },

    #[error("OCR error: {message}")]
    Ocr { message: String },

    #[error("Transform error: {message}")]
    Transform { message: String },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

impl EtlError {
    pub fn extraction(message: impl Into<String>) -> Self {
        EtlError::Extraction {
            message: message.into(),
        }
    }

    pub fn transform(message: impl Into<String>) -> Self {
        EtlError::Transform {
            message: message.into(),
        }
    }

    pub fn ocr(message: impl Into<String>) -> Self {
        EtlError::Ocr {
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        EtlError::Database {
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for EtlError {
    fn from(err: sqlx::Error) -> Self {
        EtlError::Database {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
