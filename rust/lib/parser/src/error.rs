use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn one input file into a translation unit.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {message}", path.display())]
    Syntax {
        path: PathBuf,
        line: u32,
        message: String,
    },

    #[error("{}:{line}: preprocessor: {message}", path.display())]
    Preprocessor {
        path: PathBuf,
        line: u32,
        message: String,
    },

    #[error("invalid AST document {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ParseError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ParseError::NotFound(_))
    }
}
