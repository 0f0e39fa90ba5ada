use thiserror::Error;

#[derive(Error, Debug)]
pub enum AttributionError {
    #[error("Invalid input record {record}: {details}")]
    InvalidInput { record: String, details: String },

    #[error("Document {document} maps to unit {first_unit} and unit {second_unit}")]
    AmbiguousMapping {
        document: String,
        first_unit: String,
        second_unit: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AttributionError>;
