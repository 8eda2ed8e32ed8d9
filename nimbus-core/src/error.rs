use thiserror::Error;

pub type Result<T> = std::result::Result<T, NimbusError>;

#[derive(Error, Debug)]
pub enum NimbusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed structure: {0}")]
    MalformedStructure(String),

    #[error("malformed string: {0}")]
    MalformedString(String),

    #[error("malformed number: {0}")]
    MalformedNumber(String),

    #[error("record is missing the 'id' field")]
    MissingId,

    #[error("invalid Lamport clock value: {0}")]
    InvalidLamport(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(String),
}
