//! Error types for the editor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Invalid edit: {0}")]
    Edit(#[from] crate::edits::EditError),

    #[error("Parse error: {0}")]
    Parse(#[from] quire_dom::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No document is open")]
    NoDocument,

    #[error("Unknown document: {0}")]
    UnknownDocument(String),
}
