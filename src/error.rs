use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("No transactions found in input data")]
    NoTransactions,

    #[error("Date parse error: {0}")]
    DateError(String),

    #[error("Invalid configuration for '{field}': {details}")]
    InvalidConfig { field: String, details: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MetricsError>;
