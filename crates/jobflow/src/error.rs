use std::path::PathBuf;
use thiserror::Error;

use crate::workflow::WorkflowError;

#[derive(Error, Debug)]
pub enum JobflowError {
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },
}

impl JobflowError {
    /// The workflow refusal behind this error, if that is what it is.
    pub fn as_workflow(&self) -> Option<&WorkflowError> {
        match self {
            JobflowError::Workflow(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid notification sender address '{address}'")]
    InvalidAddress { address: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File already exists: {0}")]
    FileExists(PathBuf),

    #[error("Invalid file name '{0}'")]
    InvalidFileName(String),

    #[error("File '{name}' is not accepted for {kind}")]
    UnsupportedFile { name: String, kind: String },
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("Failed to finish CSV output: {0}")]
    Flush(String),
}

pub type Result<T> = std::result::Result<T, JobflowError>;
