use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("missing source: {0}")]
    MissingSource(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    #[error("io error: {0}")]
    Io(String),

    #[error("unexpected: {0}")]
    Unexpected(String),
}
