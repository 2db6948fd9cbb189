//! Errors raised while loading or validating a desired-state document

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("Failed to read state file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid state document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid state: {0}")]
    Invalid(String),

    #[error("Unknown value '{value}' for {option}")]
    UnknownOption { option: &'static str, value: String },
}
