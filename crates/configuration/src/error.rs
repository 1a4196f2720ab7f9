//! Errors that can occur while reading, writing, or resolving configuration.

use std::path::PathBuf;

use thiserror::Error;

/// The errors that can be thrown when processing configuration.
#[derive(Debug, Error)]
pub enum ParseConfigurationError {
    #[error("parse error on {}:{line}:{column}: {message}", .file_path.display())]
    ParseError {
        file_path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },
    #[error("empty connection URI in {}", .file_path.display())]
    EmptyConnectionUri { file_path: PathBuf },
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("I/O error: {0}")]
    IoErrorButStringified(String),
    #[error("did not find expected version tag in {0}")]
    DidNotFindExpectedVersionTag(String),
    #[error("unable to parse any configuration versions: {0}")]
    UnableToParseAnyVersions(String),
}

/// The errors that can be thrown when writing configuration to disk.
#[derive(Debug, Error)]
pub enum WriteParsedConfigurationError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// The errors that can be thrown when elaborating a runtime configuration.
#[derive(Debug, Error)]
pub enum MakeRuntimeConfigurationError {
    #[error("missing environment variable when processing {}: {message}", .file_path.display())]
    MissingEnvironmentVariable { file_path: PathBuf, message: String },
    #[error("invalid value for '{field}': {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}
