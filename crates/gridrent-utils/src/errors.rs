use thiserror::Error;

/// Errors raised by the formatting and parsing helpers
#[derive(Error, Debug)]
pub enum UtilsError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Core domain error: {0}")]
    Core(#[from] gridrent_core::GridRentError),
}

#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("Failed to parse: {0}")]
    InvalidFormat(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, UtilsError>;
