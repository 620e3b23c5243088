//! Error types for the template module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while validating or resolving a filename template.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// Template is empty or whitespace only.
    #[error("Template is empty")]
    Empty,

    /// Template contains a character that is illegal in file names.
    #[error("Template contains illegal character '{0}'")]
    IllegalCharacter(char),

    /// Template references a placeholder that does not exist.
    #[error("Unknown placeholder: {{{0}}}")]
    UnknownPlaceholder(String),

    /// The input file name cannot be used as text.
    #[error("File name is not valid UTF-8: {path}")]
    NonUtf8Path { path: PathBuf },

    /// A custom template tried to reuse a built-in name.
    #[error("Template name is reserved by a built-in template: {0}")]
    ReservedName(String),
}
