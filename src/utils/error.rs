use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("invalid record at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("missing key '{key}' in {context}")]
    MissingKeyError { key: String, context: String },

    #[error("column '{column}' not found in table")]
    MissingColumnError { column: String },

    #[error("type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatchError {
        context: String,
        expected: String,
        found: String,
    },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PrepError>;
