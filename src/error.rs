use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("bad mode line: {0}")]
    BadModeLine(String),

    #[error("line {0:?} doesn't match expected format")]
    BadRecord(String),

    #[error("inconsistent NumStmt: changed from {previous} to {current}")]
    InconsistentStatements { previous: u32, current: u32 },

    #[error("package required when using go modules")]
    PackageRequired,

    #[error("failed to resolve packages: {0}")]
    Resolve(String),

    #[error("failed to scan source: {0}")]
    Scan(String),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Reading the coverage profile itself failed.
    #[error(transparent)]
    Input(io::Error),

    /// Reading a source file to recover declarations failed.
    #[error(transparent)]
    SourceRead(io::Error),

    /// The output sink rejected a write.
    #[error(transparent)]
    Output(io::Error),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
