//! Upload ingestion: parse, validate, summarize, replace
//!
//! The [`DatasetReplacer`] is the only writer of stored datasets.

pub mod parser;
pub mod replacer;

pub use parser::*;
pub use replacer::*;

use thiserror::Error;
use tscale_core::Rejection;
use tscale_db::DbError;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Line {line}: {message}")]
    Field { line: u64, message: String },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid upload: {0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Rejected(#[from] Rejection),

    #[error("Storage failure: {0}")]
    Storage(#[from] DbError),
}

impl IngestError {
    /// Client-caused failures leave the store untouched
    pub fn is_client_error(&self) -> bool {
        matches!(self, IngestError::Parse(_) | IngestError::Rejected(_))
    }
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Base name of an uploaded file, with any `/` or `\` path removed
pub fn base_file_name(raw: &str) -> &str {
    raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_file_name() {
        assert_eq!(base_file_name("data.csv"), "data.csv");
        assert_eq!(base_file_name("/tmp/upload/data.csv"), "data.csv");
        assert_eq!(base_file_name(r"C:\Users\me\data.csv"), "data.csv");
        assert_eq!(base_file_name("dir/"), "");
    }

    #[test]
    fn test_client_errors() {
        assert!(IngestError::Rejected(Rejection::ValueNegative).is_client_error());
        assert!(!IngestError::Storage(DbError::ConfigError("x".into())).is_client_error());
    }
}
